//! Summary statistics recomputed from a security log by text matching.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const MISSING_LOG_LINE: &str = "(log file not found)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub safe: usize,
    pub corrupted: usize,
    pub last_anomaly: Option<String>,
}

/// Fold one log line into `summary`.
pub fn accumulate(summary: &mut LogSummary, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if line.contains("INFO:") && line.contains("verified OK") {
        summary.safe += 1;
    } else if (line.contains("WARNING:") && line.contains("integrity failed"))
        || line.contains("ALERT:")
    {
        summary.corrupted += 1;
        let ts = line.split(']').next().unwrap_or_default().trim_matches('[');
        summary.last_anomaly = Some(ts.to_string());
    }
}

pub fn summarize_text(text: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in text.lines() {
        accumulate(&mut summary, line);
    }
    summary
}

/// Summary of the log at `path`; a missing log yields zero counts.
pub fn summarize(path: &Path) -> io::Result<LogSummary> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(summarize_text(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LogSummary::default()),
        Err(e) => Err(e),
    }
}

/// Last `n` lines of the log at `path`.
pub fn tail(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(vec![MISSING_LOG_LINE.to_string()])
        }
        Err(e) => return Err(e),
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

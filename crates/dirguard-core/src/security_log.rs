//! Text rendering of engine events for the security log.
//!
//! Line format: `[YYYY-mm-dd HH:MM:SS] LEVEL: File <path> <message>`.
//! The status summary in [`crate::log_stats`] recognises the literal
//! phrases `verified OK`, `integrity failed` and the `ALERT:` prefix, so
//! those must not change.

use crate::events::{BaselineChange, ClassificationEvent, EventSink, Outcome, Severity};
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_line(ts: DateTime<Utc>, severity: Severity, file: Option<&str>, message: &str) -> String {
    match file {
        Some(path) => format!(
            "[{}] {}: File {} {}",
            format_timestamp(ts),
            severity.as_str(),
            path,
            message
        ),
        None => format!("[{}] {}: {}", format_timestamp(ts), severity.as_str(), message),
    }
}

pub fn describe_event(event: &ClassificationEvent) -> String {
    match event.outcome {
        Outcome::NewFile => "detected as unknown.".to_string(),
        Outcome::DeletedFile => "deleted from monitored folder.".to_string(),
        Outcome::Verified => "verified OK.".to_string(),
        Outcome::Corrupted => "integrity failed!".to_string(),
        Outcome::Unreadable => format!(
            "could not be read: {}",
            event.detail.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn describe_change(change: &BaselineChange) -> (Severity, String) {
    match change {
        BaselineChange::Seeded { .. } => (Severity::Info, "added to baseline.".into()),
        BaselineChange::SeedFailed { error, .. } => (
            Severity::Warning,
            format!("failed to hash during baseline creation: {error}"),
        ),
        BaselineChange::Added { .. } => (Severity::Info, "added to baseline (auto-update).".into()),
        BaselineChange::Removed { .. } => {
            (Severity::Info, "removed from baseline (auto-update).".into())
        }
        BaselineChange::Healed { .. } => (
            Severity::Info,
            "baseline updated after modification (auto-update).".into(),
        ),
        BaselineChange::Rehashed { .. } => (
            Severity::Info,
            "baseline re-hashed with the configured algorithm (auto-update).".into(),
        ),
    }
}

/// Appends rendered lines to the log file and optionally echoes them to stdout.
pub struct SecurityLog {
    file: Mutex<File>,
    echo: bool,
}

impl SecurityLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            echo: true,
        })
    }

    /// Disable the stdout copy of each line.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn write_line(&self, line: &str) {
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}").and_then(|_| file.flush()) {
            warn!(error = %e, "cannot append to security log");
        }
        if self.echo {
            println!("{line}");
        }
    }

    pub fn info(&self, message: &str) {
        self.message(Severity::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.message(Severity::Warning, message);
    }

    pub fn alert(&self, message: &str) {
        self.message(Severity::Alert, message);
    }
}

impl EventSink for SecurityLog {
    fn classified(&self, event: &ClassificationEvent) {
        let line = format_line(
            event.timestamp,
            event.outcome.severity(),
            Some(&event.path),
            &describe_event(event),
        );
        self.write_line(&line);
    }

    fn baseline_changed(&self, change: &BaselineChange) {
        let (severity, message) = describe_change(change);
        self.write_line(&format_line(Utc::now(), severity, Some(change.path()), &message));
    }

    fn message(&self, severity: Severity, message: &str) {
        self.write_line(&format_line(Utc::now(), severity, None, message));
    }
}

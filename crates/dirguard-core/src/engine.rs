//! Diff / classification engine.
//!
//! A check cycle partitions every known path into exactly one of three
//! disjoint sets (only on disk, only in the baseline, in both) and emits at
//! most one [`ClassificationEvent`] per path. With auto-update enabled the
//! baseline is brought in line with what was observed, after alerting.

use crate::baseline::{Baseline, BaselineEntry};
use crate::error::Result;
use crate::events::{BaselineChange, ClassificationEvent, EventSink, Outcome, Severity};
use crate::hasher::Hasher;
use crate::notifier::{Alert, Notifier};
use crate::scanner::{Snapshot, SnapshotSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Disjoint split of `keys(snapshot) ∪ keys(baseline)`, each side sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub only_in_snapshot: Vec<String>,
    pub only_in_baseline: Vec<String>,
    pub in_both: Vec<String>,
}

pub fn partition(snapshot: &Snapshot, baseline: &Baseline) -> Partition {
    let mut parts = Partition::default();
    for path in snapshot.keys() {
        if baseline.contains(path) {
            parts.in_both.push(path.clone());
        } else {
            parts.only_in_snapshot.push(path.clone());
        }
    }
    parts.only_in_baseline = baseline
        .paths()
        .filter(|p| !snapshot.contains_key(p.as_str()))
        .cloned()
        .collect();
    parts
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckCounts {
    pub safe: usize,
    pub corrupted: usize,
    pub new_files: usize,
    pub deleted_files: usize,
    pub last_anomaly: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub counts: CheckCounts,
    pub events: Vec<ClassificationEvent>,
}

impl CheckReport {
    fn record(&mut self, sink: &dyn EventSink, event: ClassificationEvent) {
        match event.outcome {
            Outcome::Verified => self.counts.safe += 1,
            Outcome::Corrupted | Outcome::Unreadable => self.counts.corrupted += 1,
            Outcome::NewFile => self.counts.new_files += 1,
            Outcome::DeletedFile => self.counts.deleted_files += 1,
        }
        if event.outcome.is_anomaly() {
            self.counts.last_anomaly = Some(event.timestamp);
        }
        sink.classified(&event);
        self.events.push(event);
    }
}

pub struct IntegrityEngine {
    hasher: Hasher,
    notifier: Arc<dyn Notifier>,
    recipient: String,
}

impl IntegrityEngine {
    pub fn new(hasher: Hasher, notifier: Arc<dyn Notifier>, recipient: impl Into<String>) -> Self {
        Self {
            hasher,
            notifier,
            recipient: recipient.into(),
        }
    }

    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Run one classification pass against `baseline`.
    ///
    /// Only a failed snapshot aborts the pass. `baseline` is modified only
    /// when `auto_update` is set.
    pub fn check(
        &self,
        source: &dyn SnapshotSource,
        baseline: &mut Baseline,
        auto_update: bool,
        sink: &dyn EventSink,
    ) -> Result<CheckReport> {
        let snapshot = source.snapshot()?;
        let parts = partition(&snapshot, baseline);
        debug!(
            new = parts.only_in_snapshot.len(),
            deleted = parts.only_in_baseline.len(),
            common = parts.in_both.len(),
            "baseline partitioned"
        );

        let mut report = CheckReport::default();

        let configured = self.hasher.algorithm();

        for path in &parts.only_in_snapshot {
            report.record(sink, ClassificationEvent::new(path, Outcome::NewFile));
            if !auto_update {
                continue;
            }
            let meta = &snapshot[path];
            match self.hasher.digest(&meta.absolute_path) {
                Ok(hash) => {
                    baseline.insert(
                        path.clone(),
                        BaselineEntry::from_metadata(hash, configured, meta),
                    );
                    sink.baseline_changed(&BaselineChange::Added { path: path.clone() });
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "new file not added to baseline");
                }
            }
        }

        for path in &parts.only_in_baseline {
            if let Some(dir) = snapshot.hidden_by(path) {
                report.record(
                    sink,
                    ClassificationEvent::new(path, Outcome::Unreadable)
                        .with_detail(format!("directory {dir} could not be listed")),
                );
                continue;
            }
            report.record(sink, ClassificationEvent::new(path, Outcome::DeletedFile));
            if auto_update {
                baseline.remove(path);
                sink.baseline_changed(&BaselineChange::Removed { path: path.clone() });
            }
        }

        for path in &parts.in_both {
            let meta = &snapshot[path];
            let Some(entry) = baseline.get_mut(path) else {
                continue;
            };

            // Compare against the digest the entry was recorded with.
            let recorded = entry.algorithm();
            let actual = match self.hasher.with_algorithm(recorded).digest(&meta.absolute_path) {
                Ok(hash) => hash,
                Err(e) => {
                    let detail = match &e {
                        crate::IntegrityError::Read { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    report.record(
                        sink,
                        ClassificationEvent::new(path, Outcome::Unreadable).with_detail(detail),
                    );
                    continue;
                }
            };

            if actual == entry.hash {
                report.record(sink, ClassificationEvent::new(path, Outcome::Verified));
                if auto_update && recorded != configured {
                    match self.hasher.digest(&meta.absolute_path) {
                        Ok(hash) => {
                            entry.refresh(hash, configured, meta);
                            sink.baseline_changed(&BaselineChange::Rehashed { path: path.clone() });
                        }
                        Err(e) => warn!(path = %path, error = %e, "cannot re-hash verified file"),
                    }
                }
                continue;
            }

            let expected = entry.hash.clone();
            report.record(
                sink,
                ClassificationEvent::new(path, Outcome::Corrupted)
                    .with_detail(format!("baseline {expected}, current {actual}")),
            );

            let alert = Alert::integrity_failed(path, &expected, &actual, &self.recipient);
            if let Err(e) = self.notifier.notify(&alert) {
                warn!(path = %path, error = %e, "alert delivery failed");
                sink.message(Severity::Warning, &format!("Alert delivery for {path} failed: {e}"));
            }

            if auto_update {
                let (hash, algorithm) = if recorded == configured {
                    (actual, recorded)
                } else {
                    match self.hasher.digest(&meta.absolute_path) {
                        Ok(hash) => (hash, configured),
                        Err(_) => (actual, recorded),
                    }
                };
                entry.refresh(hash, algorithm, meta);
                sink.baseline_changed(&BaselineChange::Healed { path: path.clone() });
            }
        }

        info!(
            safe = report.counts.safe,
            corrupted = report.counts.corrupted,
            new = report.counts.new_files,
            deleted = report.counts.deleted_files,
            "check complete"
        );
        Ok(report)
    }
}

//! Directory integrity watching.
//!
//! A [`Monitor`] establishes a content-digest baseline for a directory tree
//! and re-checks it on demand, classifying every file as new, deleted,
//! verified, corrupted or unreadable.

pub mod baseline;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hasher;
pub mod log_stats;
pub mod monitor;
pub mod notifier;
pub mod scanner;
pub mod security_log;

pub use baseline::{Baseline, BaselineEntry, BaselineStore};
pub use config::{HashAlgorithm, MonitorConfig, SmtpConfig};
pub use engine::{partition, CheckCounts, CheckReport, IntegrityEngine, Partition};
pub use error::{IntegrityError, Result};
pub use events::{BaselineChange, ClassificationEvent, EventSink, NullSink, Outcome, Severity};
pub use hasher::Hasher;
pub use monitor::Monitor;
pub use notifier::{Alert, Notifier, NotifierError, SimulatedNotifier};
pub use scanner::{DirectoryScanner, FileMetadata, Snapshot, SnapshotSource};
pub use security_log::SecurityLog;

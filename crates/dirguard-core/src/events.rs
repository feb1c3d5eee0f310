use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Alert => "ALERT",
        }
    }
}

/// Classification assigned to a path in one check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NewFile,
    DeletedFile,
    Verified,
    Corrupted,
    Unreadable,
}

impl Outcome {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Verified => Severity::Info,
            Self::Corrupted => Severity::Warning,
            Self::NewFile | Self::DeletedFile | Self::Unreadable => Severity::Alert,
        }
    }

    /// Whether this outcome moves the last-anomaly timestamp.
    pub fn is_anomaly(&self) -> bool {
        !matches!(self, Self::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub path: String,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    /// Free-form context: the digests for `Corrupted`, the error for `Unreadable`.
    pub detail: Option<String>,
}

impl ClassificationEvent {
    pub fn new(path: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            path: path.into(),
            outcome,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Baseline maintenance performed by the engine or at initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BaselineChange {
    /// Recorded while creating the initial baseline.
    Seeded { path: String },
    /// Could not be hashed while creating the initial baseline.
    SeedFailed { path: String, error: String },
    Added { path: String },
    Removed { path: String },
    Healed { path: String },
    /// Verified content re-hashed with the configured algorithm.
    Rehashed { path: String },
}

impl BaselineChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Seeded { path }
            | Self::SeedFailed { path, .. }
            | Self::Added { path }
            | Self::Removed { path }
            | Self::Healed { path }
            | Self::Rehashed { path } => path,
        }
    }
}

/// Receives engine output as it happens.
///
/// Implementations must not fail the cycle; write errors are theirs to log.
pub trait EventSink: Send + Sync {
    fn classified(&self, event: &ClassificationEvent);

    fn baseline_changed(&self, _change: &BaselineChange) {}

    /// Free-standing lines that are not tied to one file.
    fn message(&self, _severity: Severity, _message: &str) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn classified(&self, _event: &ClassificationEvent) {}
}

use std::path::PathBuf;

/// Result type for integrity operations
pub type Result<T> = std::result::Result<T, IntegrityError>;

/// Errors raised by the scan / baseline / diff engine.
///
/// Only `DirectoryNotFound` and the baseline store variants cross the
/// engine boundary; per-file `Read` failures are absorbed into
/// classification outcomes.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("Directory {} not found", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("baseline {} is corrupt: {source}", .path.display())]
    BaselineCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write baseline {}: {source}", .path.display())]
    BaselineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntegrityError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

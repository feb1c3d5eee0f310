use crate::error::{IntegrityError, Result};
use crate::hasher::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ROOT: &str = "./secure_files";
pub const DEFAULT_BASELINE: &str = "hash_db.json";
pub const DEFAULT_LOG: &str = "security.log";
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RECIPIENT: &str = "admin@example.com";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "unknown hash algorithm '{other}' (expected sha256, sha512 or blake3)"
            )),
        }
    }
}

/// Settings for one monitored root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub root: PathBuf,
    pub baseline_path: PathBuf,
    pub log_path: PathBuf,
    pub interval_secs: u64,
    pub auto_update: bool,
    pub algorithm: HashAlgorithm,
    pub chunk_size: usize,
    /// Treat a corrupt baseline store as absent and rebuild it.
    pub rebuild_baseline: bool,
    /// Recipient used when no SMTP config names one.
    pub recipient: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            baseline_path: PathBuf::from(DEFAULT_BASELINE),
            log_path: PathBuf::from(DEFAULT_LOG),
            interval_secs: DEFAULT_INTERVAL_SECS,
            auto_update: false,
            algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            rebuild_baseline: false,
            recipient: DEFAULT_RECIPIENT.to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_true() -> bool {
    true
}

/// Mail transport settings, read from the `--smtp-config` JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_addr: String,
    #[serde(default)]
    pub to_addr: Option<String>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub enabled: bool,
}

impl SmtpConfig {
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data).map_err(|e| IntegrityError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(config))
    }

    /// STARTTLS submission port when `use_tls`, implicit TLS otherwise.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_tls { 587 } else { 465 })
    }
}

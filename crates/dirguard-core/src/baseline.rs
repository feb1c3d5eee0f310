//! Trusted reference state and its on-disk store.
//!
//! The store is a single JSON object keyed by relative path:
//! `{ "<path>": {"hash": "...", "mtime": 1700000000.5, "size": 12}, ... }`.
//! An entry hashed with anything but sha256 also carries `"algo"`; fields
//! this crate does not know are kept as-is across load and save.
//! Writes go to a sibling temp file which is renamed into place, so a
//! reader never observes a half-written document.

use crate::config::HashAlgorithm;
use crate::error::{IntegrityError, Result};
use crate::scanner::FileMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub mtime: f64,
    #[serde(default)]
    pub size: u64,
    /// Digest algorithm behind `hash`; absent means sha256.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<HashAlgorithm>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BaselineEntry {
    pub fn new(hash: impl Into<String>, mtime: f64, size: u64) -> Self {
        Self {
            hash: hash.into(),
            mtime,
            size,
            algo: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn from_metadata(hash: String, algorithm: HashAlgorithm, meta: &FileMetadata) -> Self {
        let mut entry = Self::new(String::new(), 0.0, 0);
        entry.refresh(hash, algorithm, meta);
        entry
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algo.unwrap_or_default()
    }

    /// Replace the trusted digest and metadata, keeping unknown fields.
    pub fn refresh(&mut self, hash: String, algorithm: HashAlgorithm, meta: &FileMetadata) {
        self.hash = hash;
        self.mtime = meta.mtime;
        self.size = meta.size;
        self.algo = match algorithm {
            HashAlgorithm::Sha256 => None,
            other => Some(other),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Baseline {
    entries: BTreeMap<String, BaselineEntry>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&BaselineEntry> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut BaselineEntry> {
        self.entries.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: BaselineEntry) -> Option<BaselineEntry> {
        self.entries.insert(path.into(), entry)
    }

    pub fn remove(&mut self, path: &str) -> Option<BaselineEntry> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl FromIterator<(String, BaselineEntry)> for Baseline {
    fn from_iter<I: IntoIterator<Item = (String, BaselineEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
    reset_on_corrupt: bool,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reset_on_corrupt: false,
        }
    }

    /// Treat an unparseable store as absent instead of failing.
    pub fn reset_on_corrupt(mut self, enabled: bool) -> Self {
        self.reset_on_corrupt = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store. `Ok(None)` means there is no usable baseline yet.
    pub fn open(&self) -> Result<Option<Baseline>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IntegrityError::read(&self.path, e)),
        };
        match serde_json::from_str::<Baseline>(&data) {
            Ok(baseline) => {
                debug!(path = %self.path.display(), entries = baseline.len(), "baseline loaded");
                Ok(Some(baseline))
            }
            Err(source) if self.reset_on_corrupt => {
                warn!(path = %self.path.display(), error = %source, "baseline corrupt, resetting");
                Ok(None)
            }
            Err(source) => Err(IntegrityError::BaselineCorrupt {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read the store, treating a missing file as an empty baseline.
    pub fn load(&self) -> Result<Baseline> {
        Ok(self.open()?.unwrap_or_default())
    }

    /// Replace the store with `baseline` in one rename.
    pub fn save(&self, baseline: &Baseline) -> Result<()> {
        let write_err = |source: std::io::Error| IntegrityError::BaselineWrite {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let json = serde_json::to_string_pretty(baseline)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), entries = baseline.len(), "baseline saved");
        Ok(())
    }
}

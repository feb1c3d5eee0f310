//! One complete check cycle: load the baseline, seed it on first use,
//! classify, persist.
//!
//! Concurrent cycles against the same baseline file are not supported; the
//! caller runs one cycle at a time.

use crate::baseline::{Baseline, BaselineEntry, BaselineStore};
use crate::config::MonitorConfig;
use crate::engine::{CheckReport, IntegrityEngine};
use crate::error::Result;
use crate::events::{BaselineChange, EventSink, Severity};
use crate::hasher::Hasher;
use crate::notifier::Notifier;
use crate::scanner::DirectoryScanner;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Monitor {
    config: MonitorConfig,
    scanner: DirectoryScanner,
    store: BaselineStore,
    engine: IntegrityEngine,
    sink: Arc<dyn EventSink>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, notifier: Arc<dyn Notifier>, sink: Arc<dyn EventSink>) -> Self {
        let hasher = Hasher::new(config.algorithm).with_chunk_size(config.chunk_size);
        let engine = IntegrityEngine::new(hasher, notifier, config.recipient.clone());
        let store = BaselineStore::new(&config.baseline_path).reset_on_corrupt(config.rebuild_baseline);
        Self {
            scanner: DirectoryScanner::new(&config.root),
            store,
            engine,
            sink,
            config,
        }
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Load the baseline, creating it from the current tree when the store
    /// is absent (or corrupt and rebuilding is allowed).
    pub fn prepare_baseline(&self) -> Result<Baseline> {
        if let Some(baseline) = self.store.open()? {
            return Ok(baseline);
        }

        if self.store.path().exists() {
            self.sink.message(
                Severity::Warning,
                "Baseline DB is corrupt. Rebuilding baseline from current files.",
            );
        } else {
            self.sink.message(
                Severity::Info,
                "Baseline DB not found. Creating new baseline from current files.",
            );
        }

        let snapshot = self.scanner.scan()?;
        let mut baseline = Baseline::new();
        let hasher = self.engine.hasher();
        for (path, meta) in &snapshot {
            match hasher.digest(&meta.absolute_path) {
                Ok(hash) => {
                    baseline.insert(
                        path.clone(),
                        BaselineEntry::from_metadata(hash, hasher.algorithm(), meta),
                    );
                    self.sink
                        .baseline_changed(&BaselineChange::Seeded { path: path.clone() });
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "cannot hash file for initial baseline");
                    self.sink.baseline_changed(&BaselineChange::SeedFailed {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        self.store.save(&baseline)?;
        info!(
            path = %self.store.path().display(),
            entries = baseline.len(),
            "initial baseline created"
        );
        Ok(baseline)
    }

    /// Run one check cycle and persist the resulting baseline.
    pub fn run_cycle(&self) -> Result<CheckReport> {
        let mut baseline = self.prepare_baseline()?;
        let report = self.engine.check(
            &self.scanner,
            &mut baseline,
            self.config.auto_update,
            self.sink.as_ref(),
        )?;
        self.store.save(&baseline)?;
        Ok(report)
    }
}

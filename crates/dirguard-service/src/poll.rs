//! Fixed-interval watch loop.
//!
//! Each cycle runs to completion on the blocking pool. A stop request is
//! only observed while sleeping between cycles; cycle errors are logged as
//! alerts and the loop carries on.

use dirguard_core::{Monitor, SecurityLog};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Install the Ctrl-C handler now and return a future that resolves on the
/// first interrupt. Call before the first cycle so an early Ctrl-C is held
/// rather than killing the process.
#[cfg(unix)]
pub fn interrupt() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        sigint.recv().await;
    })
}

#[cfg(not(unix))]
pub fn interrupt() -> std::io::Result<impl Future<Output = ()>> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });
    Ok(async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}

pub async fn run_watch<S>(
    monitor: Arc<Monitor>,
    log: Arc<SecurityLog>,
    interval: Duration,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let cycle = monitor.clone();
        match tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
            Ok(Ok(report)) => {
                debug!(
                    safe = report.counts.safe,
                    corrupted = report.counts.corrupted,
                    "watch cycle finished"
                );
            }
            Ok(Err(e)) => log.alert(&format!("Watcher error: {e}")),
            Err(e) => {
                error!(error = %e, "check cycle panicked");
                log.alert(&format!("Watcher error: {e}"));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                log.info("Watcher stopped by user. Exiting.");
                return;
            }
        }
    }
}

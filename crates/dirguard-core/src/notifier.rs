//! Best-effort alert delivery boundary.
//!
//! The engine hands an [`Alert`] to a [`Notifier`] when a file's content
//! changes. Failures are reported back but never abort a check cycle.

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

impl Alert {
    /// Alert describing a content change from `expected` to `actual`.
    pub fn integrity_failed(path: &str, expected: &str, actual: &str, recipient: &str) -> Self {
        Self {
            subject: format!("[ALERT] Integrity failed: {path}"),
            body: format!("File {path} changed.\nBaseline hash: {expected}\nCurrent hash: {actual}"),
            recipient: recipient.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("cannot build message: {0}")]
    Message(String),
    #[error("transport failed: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<(), NotifierError>;
}

/// Prints the alert instead of delivering it.
///
/// Used whenever mail delivery is not configured or disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedNotifier;

impl Notifier for SimulatedNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), NotifierError> {
        info!(recipient = %alert.recipient, subject = %alert.subject, "simulated alert delivery");
        println!(
            "[SIMULATED EMAIL] To: {}, Subject: {}\n{}\n",
            alert.recipient, alert.subject, alert.body
        );
        Ok(())
    }
}

//! SMTP delivery of integrity alerts.

use dirguard_core::{Alert, Notifier, NotifierError, SimulatedNotifier, SmtpConfig};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SmtpNotifier {
    from_addr: String,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    /// STARTTLS when `use_tls`, implicit TLS otherwise. No connection is
    /// made until the first alert.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifierError> {
        let builder = if config.use_tls {
            SmtpTransport::starttls_relay(&config.host)
        } else {
            SmtpTransport::relay(&config.host)
        }
        .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.effective_port())
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            from_addr: config.from_addr.clone(),
            transport,
        })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, NotifierError> {
        let from: Mailbox = self
            .from_addr
            .parse()
            .map_err(|e| NotifierError::Address(format!("{}: {e}", self.from_addr)))?;
        let to: Mailbox = alert
            .recipient
            .parse()
            .map_err(|e| NotifierError::Address(format!("{}: {e}", alert.recipient)))?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject.as_str())
            .body(alert.body.clone())
            .map_err(|e| NotifierError::Message(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), NotifierError> {
        let message = self.build_message(alert)?;
        self.transport
            .send(&message)
            .map_err(|e| NotifierError::Transport(e.to_string()))?;
        info!(recipient = %alert.recipient, "alert mail sent");
        Ok(())
    }
}

/// Real delivery when the config is present and enabled, simulated otherwise.
pub fn notifier_for(config: Option<&SmtpConfig>) -> Arc<dyn Notifier> {
    match config {
        Some(cfg) if cfg.enabled => match SmtpNotifier::new(cfg) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                warn!(host = %cfg.host, error = %e, "SMTP transport unavailable, simulating alerts");
                Arc::new(SimulatedNotifier)
            }
        },
        _ => Arc::new(SimulatedNotifier),
    }
}

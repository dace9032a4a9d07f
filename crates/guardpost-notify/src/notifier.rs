//! Notifier trait and SMTP implementation

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use guardpost_core::{Error, Result};

use crate::template;
use crate::AlertNotification;

/// Dispatches a rendered alert to the guardian. Best-effort: callers log and
/// discard failures, and never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery once
    async fn notify(&self, alert: &AlertNotification) -> Result<()>;
}

/// SMTP transport settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub host: String,

    /// Relay port (implicit TLS)
    pub port: u16,

    /// Account username
    pub username: String,

    /// Account password (app password for most providers)
    pub password: String,

    /// Sender address
    pub from: String,

    /// Guardian address
    pub to: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
        }
    }
}

/// E-mail notifier over async SMTP with implicit TLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Build a notifier from transport settings
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| Error::notification(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::notification(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = config
            .to
            .parse()
            .map_err(|e| Error::notification(format!("Invalid recipient address: {}", e)))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, alert: &AlertNotification) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(template::SUBJECT)
            .multipart(MultiPart::alternative_plain_html(
                template::render_text(alert),
                template::render_html(alert),
            ))
            .map_err(|e| Error::notification(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| Error::notification(format!("SMTP send failed: {}", e)))?;

        tracing::info!(url = %alert.url, "Alert notification sent");
        Ok(())
    }
}

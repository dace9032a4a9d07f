//! Guardpost Notify
//!
//! Best-effort alert notifications over SMTP.
//!
//! A violation produces at most one delivery attempt; the orchestrator never
//! blocks its response on mail-transport latency, and a transport failure is
//! reduced to a log line.

pub mod notifier;
pub mod template;

use chrono::{DateTime, Utc};

use guardpost_core::DeviceReport;

pub use notifier::{Notifier, SmtpConfig, SmtpNotifier};
pub use template::SUBJECT;

/// Everything the notification template needs about one violation
#[derive(Debug, Clone)]
pub struct AlertNotification {
    /// The page where the content was detected
    pub url: String,

    /// Device metadata as received
    pub device: DeviceReport,

    /// Detection time shown to the guardian
    pub detected_at: DateTime<Utc>,
}

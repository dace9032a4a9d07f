//! Server configuration

use clap::Parser;
use std::path::PathBuf;

use guardpost_classifiers::DEFAULT_MODEL_REPO;
use guardpost_notify::SmtpConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "guardpost-server")]
#[command(about = "Guardpost content moderation server", long_about = None)]
pub struct Cli {
    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8000", env = "GUARDPOST_PORT")]
    pub port: u16,

    /// SQLite database URL
    #[arg(
        long,
        default_value = "sqlite://guardpost.db",
        env = "GUARDPOST_DATABASE_URL"
    )]
    pub database_url: String,

    /// HuggingFace repo of the toxicity model
    #[arg(long, default_value = DEFAULT_MODEL_REPO, env = "GUARDPOST_MODEL_REPO")]
    pub model_repo: String,

    /// Local model directory, overriding the HuggingFace repo
    #[arg(long, env = "GUARDPOST_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Policy file (YAML); the built-in default policy applies when omitted
    #[arg(short, long, env = "GUARDPOST_POLICY")]
    pub policy: Option<PathBuf>,

    /// Start loading the classification model at startup instead of on the
    /// first request
    #[arg(long)]
    pub warmup: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// SMTP settings from the environment.
///
/// Notifications stay disabled unless `GUARDPOST_SMTP_USERNAME` and
/// `GUARDPOST_SMTP_PASSWORD` are both set. `GUARDPOST_ALERT_FROM` and
/// `GUARDPOST_ALERT_TO` default to the username.
pub fn smtp_from_env() -> Option<SmtpConfig> {
    let username = std::env::var("GUARDPOST_SMTP_USERNAME").ok()?;
    let password = std::env::var("GUARDPOST_SMTP_PASSWORD").ok()?;

    let defaults = SmtpConfig::default();
    let from = std::env::var("GUARDPOST_ALERT_FROM").unwrap_or_else(|_| username.clone());
    let to = std::env::var("GUARDPOST_ALERT_TO").unwrap_or_else(|_| from.clone());

    Some(SmtpConfig {
        host: std::env::var("GUARDPOST_SMTP_HOST").unwrap_or(defaults.host),
        port: std::env::var("GUARDPOST_SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        username,
        password,
        from,
        to,
    })
}

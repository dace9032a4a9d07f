//! Guardpost Server
//!
//! Parental-control content moderation backend: receives browsed text plus
//! device metadata from the browser extension, scores it with a toxicity
//! classifier, and on a policy violation records an alert and notifies the
//! guardian by e-mail.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use guardpost_classifiers::{ClassifierGateway, ModelSpec, ToxicityModelLoader};
use guardpost_notify::{Notifier, SmtpNotifier};
use guardpost_policy::Policy;
use guardpost_server::config::{self, Cli};
use guardpost_server::{create_router, AppState};
use guardpost_store::AlertStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Guardpost server");

    let policy = match &cli.policy {
        Some(path) => Policy::from_file(path)?,
        None => Policy::default(),
    };
    info!(
        "Policy '{}' active: {} trigger labels, threshold {}",
        policy.name,
        policy.trigger_labels.len(),
        policy.threshold
    );

    let store = AlertStore::connect(&cli.database_url).await?;
    info!("Alert store ready: {}", cli.database_url);

    let spec = match &cli.model_dir {
        Some(dir) => ModelSpec::local(dir),
        None => ModelSpec::huggingface(&cli.model_repo),
    };
    info!("Toxicity model: {}", spec.name);
    let gateway = Arc::new(ClassifierGateway::new(Arc::new(ToxicityModelLoader::new(
        spec,
    ))));

    let notifier: Option<Arc<dyn Notifier>> = match config::smtp_from_env() {
        Some(smtp) => {
            info!("Alert notifications enabled, recipient: {}", smtp.to);
            Some(Arc::new(SmtpNotifier::new(&smtp)?))
        }
        None => {
            warn!("SMTP not configured, alert notifications disabled");
            None
        }
    };

    let metrics = init_metrics()?;

    let state = AppState {
        gateway: gateway.clone(),
        policy: Arc::new(policy),
        store,
        notifier,
        metrics,
    };

    if cli.warmup {
        tokio::spawn(async move {
            if let Err(e) = gateway.classify("warmup").await {
                warn!("Model warmup failed, will retry on first request: {}", e);
            } else {
                info!("Model warmup complete");
            }
        });
    }

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Guardpost listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("guardpost=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guardpost=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return the render handle
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    metrics::describe_counter!(
        "guardpost_requests_total",
        "Total number of moderation requests processed"
    );
    metrics::describe_counter!(
        "guardpost_violations_total",
        "Total number of policy violations detected"
    );
    metrics::describe_counter!(
        "guardpost_alerts_persisted_total",
        "Total number of alerts written to the store"
    );
    metrics::describe_counter!(
        "guardpost_notification_failures_total",
        "Total number of failed notification attempts"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}

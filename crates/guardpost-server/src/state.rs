//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use guardpost_classifiers::ClassifierGateway;
use guardpost_notify::Notifier;
use guardpost_policy::Policy;
use guardpost_store::AlertStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Lazily-initialized classifier handle
    pub gateway: Arc<ClassifierGateway>,

    /// Moderation policy
    pub policy: Arc<Policy>,

    /// Alert persistence
    pub store: AlertStore,

    /// Notification sink; `None` disables notifications
    pub notifier: Option<Arc<dyn Notifier>>,

    /// Prometheus render handle for the /metrics endpoint
    pub metrics: PrometheusHandle,
}

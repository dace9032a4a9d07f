//! Moderation orchestrator
//!
//! One pass per request: classify, decide, and on a violation fan out the
//! persistence and notification side effects. Only a classifier failure
//! propagates to the caller; everything after the verdict is best-effort.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use guardpost_core::{DeviceReport, LabelScore, Result};
use guardpost_notify::AlertNotification;
use guardpost_store::NewAlert;

use crate::state::AppState;

/// Upper bound on how long the response path waits for the alert write
pub const PERSIST_WAIT: Duration = Duration::from_secs(2);

/// One moderation request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModerateRequest {
    /// Text under inspection
    pub text: String,

    /// Page the text was captured from
    pub url: String,

    /// Device metadata from the extension
    #[serde(rename = "deviceInfo")]
    pub device_info: DeviceReport,
}

/// Verdict plus the raw score vector, returned for every request so
/// borderline cases stay auditable.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationOutcome {
    pub non_adequate: bool,
    pub scores: Vec<LabelScore>,
}

/// Run one request through the pipeline.
///
/// `Received -> Classified -> Decided`, then on a violation the alert is
/// persisted (awaited up to [`PERSIST_WAIT`]) and the notification is
/// dispatched without being awaited at all. Neither side effect can fail the
/// response, and neither is retracted if the client goes away.
pub async fn moderate(state: &AppState, request: ModerateRequest) -> Result<ModerationOutcome> {
    let request_id = Uuid::new_v4();
    let received_at = Utc::now();
    metrics::counter!("guardpost_requests_total").increment(1);

    tracing::info!(%request_id, url = %request.url, "Moderation request received");

    let scores = state.gateway.classify(&request.text).await?;
    let non_adequate = state.policy.decide(&scores);

    tracing::info!(%request_id, non_adequate, "Verdict computed");

    if non_adequate {
        metrics::counter!("guardpost_violations_total").increment(1);

        let detected_at = request.device_info.detected_at(received_at);

        let alert = NewAlert {
            url: request.url.clone(),
            detected_text: request.text.clone(),
            device: request.device_info.clone(),
            scores: scores.clone(),
            detected_at,
        };
        persist_alert(state, request_id, alert).await;

        let notification = AlertNotification {
            url: request.url,
            device: request.device_info,
            detected_at,
        };
        dispatch_notification(state, request_id, notification);
    }

    Ok(ModerationOutcome {
        non_adequate,
        scores,
    })
}

/// Write the alert on its own task; the response path waits at most
/// [`PERSIST_WAIT`] and then proceeds while the write keeps running.
async fn persist_alert(state: &AppState, request_id: Uuid, alert: NewAlert) {
    let store = state.store.clone();
    let write = tokio::spawn(async move { store.create(&alert).await });

    match tokio::time::timeout(PERSIST_WAIT, write).await {
        Ok(Ok(Ok(alert_id))) => {
            metrics::counter!("guardpost_alerts_persisted_total").increment(1);
            tracing::info!(%request_id, alert_id, "Alert persisted");
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(%request_id, "Alert not persisted: {}", e);
        }
        Ok(Err(e)) => {
            tracing::warn!(%request_id, "Persistence task failed: {}", e);
        }
        Err(_) => {
            tracing::warn!(
                %request_id,
                "Alert write still running after {:?}, responding without it",
                PERSIST_WAIT
            );
        }
    }
}

/// Fire-and-forget notification: at most one attempt, never awaited by the
/// response path.
fn dispatch_notification(state: &AppState, request_id: Uuid, notification: AlertNotification) {
    let Some(notifier) = state.notifier.clone() else {
        tracing::debug!(%request_id, "No notifier configured, skipping notification");
        return;
    };

    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            metrics::counter!("guardpost_notification_failures_total").increment(1);
            tracing::warn!(%request_id, "Alert notification failed: {}", e);
        }
    });
}

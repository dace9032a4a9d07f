//! Orchestrator and route behavior with a scripted classifier

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use guardpost_classifiers::{Classifier, ClassifierGateway, ClassifierLoader};
use guardpost_core::{DeviceReport, Error, LabelScore, Result};
use guardpost_notify::{AlertNotification, Notifier};
use guardpost_policy::Policy;
use guardpost_server::{create_router, moderate, AppState, ModerateRequest};
use guardpost_store::{AlertStore, ListQuery, NewAlert};

struct ScriptedClassifier {
    scores: Vec<LabelScore>,
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedLoader {
    scores: Option<Vec<LabelScore>>,
}

#[async_trait]
impl ClassifierLoader for ScriptedLoader {
    async fn load(&self) -> Result<Arc<dyn Classifier>> {
        match &self.scores {
            Some(scores) => Ok(Arc::new(ScriptedClassifier {
                scores: scores.clone(),
            })),
            None => Err(Error::model_unavailable("scripted load failure")),
        }
    }
}

#[derive(Default)]
struct CountingNotifier {
    attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _alert: &AlertNotification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn toxic_scores() -> Vec<LabelScore> {
    vec![
        LabelScore::new("toxicity", 0.92),
        LabelScore::new("insult", 0.81),
        LabelScore::new("threat", 0.1),
        LabelScore::new("identity_attack", 0.05),
    ]
}

fn clean_scores() -> Vec<LabelScore> {
    vec![
        LabelScore::new("toxicity", 0.12),
        LabelScore::new("insult", 0.7),
        LabelScore::new("threat", 0.01),
    ]
}

async fn test_state(
    scores: Option<Vec<LabelScore>>,
) -> (AppState, Arc<CountingNotifier>) {
    let notifier = Arc::new(CountingNotifier::default());

    let state = AppState {
        gateway: Arc::new(ClassifierGateway::new(Arc::new(ScriptedLoader { scores }))),
        policy: Arc::new(Policy::default()),
        store: AlertStore::in_memory().await.unwrap(),
        notifier: Some(notifier.clone()),
        metrics: PrometheusBuilder::new().build_recorder().handle(),
    };

    (state, notifier)
}

fn request() -> ModerateRequest {
    ModerateRequest {
        text: "You are a disgusting human being.".to_string(),
        url: "example.com".to_string(),
        device_info: DeviceReport {
            public_ip: Some("203.0.113.7".to_string()),
            platform: Some("Win32".to_string()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_violating_request_persists_and_notifies() {
    let (state, notifier) = test_state(Some(toxic_scores())).await;

    let outcome = moderate(&state, request()).await.unwrap();
    assert!(outcome.non_adequate);
    assert_eq!(outcome.scores, toxic_scores());

    // Notification is dispatched off the response path
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);

    let page = state.store.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].url, "example.com");
    assert_eq!(page.items[0].ip_address, "203.0.113.7");
    assert_eq!(page.items[0].scores.0, toxic_scores());
}

#[tokio::test]
async fn test_clean_request_has_no_side_effects() {
    let (state, notifier) = test_state(Some(clean_scores())).await;

    let outcome = moderate(&state, request()).await.unwrap();
    assert!(!outcome.non_adequate);
    // Scores come back for auditing even when clean
    assert_eq!(outcome.scores, clean_scores());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 0);

    let page = state.store.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_store_outage_does_not_fail_the_verdict() {
    let (state, notifier) = test_state(Some(toxic_scores())).await;
    state.store.pool().close().await;

    let outcome = moderate(&state, request()).await.unwrap();
    assert!(outcome.non_adequate);
    assert_eq!(outcome.scores, toxic_scores());

    // Notification is independent of persistence
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_classifier_failure_is_fatal() {
    let (state, notifier) = test_state(None).await;

    let err = moderate(&state, request()).await.unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable(_)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_notifier_still_persists() {
    let (mut state, _notifier) = test_state(Some(toxic_scores())).await;
    state.notifier = None;

    let outcome = moderate(&state, request()).await.unwrap();
    assert!(outcome.non_adequate);

    let page = state.store.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_moderate_endpoint_round_trip() {
    let (state, _notifier) = test_state(Some(toxic_scores())).await;
    let app = create_router(state);

    let body = serde_json::json!({
        "text": "You are a disgusting human being.",
        "url": "example.com",
        "deviceInfo": { "publicIP": "203.0.113.7" }
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/moderate")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(parsed["non_adequate"], true);
    assert_eq!(parsed["scores"][0]["label"], "toxicity");
}

#[tokio::test]
async fn test_moderate_endpoint_returns_503_when_model_is_down() {
    let (state, _notifier) = test_state(None).await;
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/moderate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text": "anything"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_never_triggers_a_model_load() {
    let (state, _notifier) = test_state(Some(toxic_scores())).await;
    let app = create_router(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["model_loaded"], false);

    // After a moderation the model reports loaded
    moderate(&state, request()).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["model_loaded"], true);
}

#[tokio::test]
async fn test_alert_detail_and_delete_endpoints() {
    let (state, _notifier) = test_state(Some(toxic_scores())).await;

    let id = state
        .store
        .create(&NewAlert {
            url: "https://example.com".to_string(),
            detected_text: "flagged".to_string(),
            device: DeviceReport::default(),
            scores: toxic_scores(),
            detected_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/alerts/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/alerts/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["status"], "success");

    // Deleting again reports not_found, still a 200
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/alerts/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["status"], "not_found");

    // Detail lookups on the removed id are a 404
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/alerts/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_date_filter_is_rejected() {
    let (state, _notifier) = test_state(Some(toxic_scores())).await;
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/alerts/date/not-a-date")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

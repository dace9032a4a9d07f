//! HTTP routes and handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use guardpost_core::Error;
use guardpost_store::{Alert, AlertFilter, AlertStats, ListQuery};

use crate::moderation::{self, ModerateRequest, ModerationOutcome};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/moderate", post(moderate))
        .route("/alerts", get(list_alerts))
        .route("/alerts/stats", get(alert_stats))
        .route("/alerts/:id", get(get_alert).delete(delete_alert))
        .route("/alerts/ip/:ip", get(alerts_by_ip))
        .route("/alerts/date/:date", get(alerts_by_date))
        .route("/alerts/url", get(alerts_by_url))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model_loaded: bool,
}

/// Liveness check. Reports model state without ever triggering or waiting
/// for a load.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: state.gateway.is_ready(),
    })
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn moderate(
    State(state): State<AppState>,
    Json(request): Json<ModerateRequest>,
) -> Result<Json<ModerationOutcome>, AppError> {
    let outcome = moderation::moderate(&state, request).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

impl PageQuery {
    fn to_list_query(&self) -> ListQuery {
        ListQuery::page(self.limit.unwrap_or(50), self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
struct AlertListResponse {
    total: i64,
    count: usize,
    items: Vec<Alert>,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<AlertListResponse>, AppError> {
    respond_with_page(&state, page.to_list_query()).await
}

async fn alerts_by_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<AlertListResponse>, AppError> {
    let query = page.to_list_query().with_filter(AlertFilter::IpEquals(ip));
    respond_with_page(&state, query).await
}

async fn alerts_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<AlertListResponse>, AppError> {
    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        AppError::InvalidRequest(format!("Invalid date '{}', expected YYYY-MM-DD", date))
    })?;

    let query = page.to_list_query().with_filter(AlertFilter::OnDate(day));
    respond_with_page(&state, query).await
}

#[derive(Debug, Deserialize)]
struct UrlQuery {
    url: String,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn alerts_by_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<AlertListResponse>, AppError> {
    let list = ListQuery::page(query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .with_filter(AlertFilter::UrlContains(query.url));
    respond_with_page(&state, list).await
}

async fn respond_with_page(
    state: &AppState,
    query: ListQuery,
) -> Result<Json<AlertListResponse>, AppError> {
    let page = state.store.list(&query).await?;
    Ok(Json(AlertListResponse {
        total: page.total,
        count: page.items.len(),
        items: page.items,
    }))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, AppError> {
    match state.store.get(id).await? {
        Some(alert) => Ok(Json(alert)),
        None => Err(AppError::NotFound(format!("Alert {} not found", id))),
    }
}

async fn alert_stats(State(state): State<AppState>) -> Result<Json<AlertStats>, AppError> {
    let stats = state.store.aggregate().await?;
    Ok(Json(stats))
}

/// Delete one alert. Absence is a distinct, non-error outcome.
async fn delete_alert(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.delete(id).await {
        Ok(true) => Json(json!({
            "status": "success",
            "message": format!("Alert {} deleted successfully", id),
        }))
        .into_response(),
        Ok(false) => Json(json!({
            "status": "not_found",
            "error": "Alert not found",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete alert {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    ModelUnavailable(String),
    InvalidRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::ModelUnavailable(msg) | Error::Classifier(msg) => {
                AppError::ModelUnavailable(msg)
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::ModelUnavailable(msg) => {
                tracing::error!("Classifier unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Classification model unavailable".to_string(),
                )
            }
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

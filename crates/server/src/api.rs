//! HTTP API for predictions, history, notifications, health and metrics

use crate::error::{ApiError, ApiResponse, ApiResult};
use axum::{
    body::Bytes,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};
use churn_lib::{
    health::{ComponentStatus, HealthRegistry},
    notify::{NotificationRegistry, NotificationSettings},
    observability::{render_metrics, ChurnMetrics, StructuredLogger},
    store::{DashboardStats, HistoryPage, HistoryParams, HistoryQuery},
    CustomerRecord, PredictionRecord, PredictionService,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const ADMIN_ROLE: &str = "admin";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub notifications: Arc<NotificationRegistry>,
    pub metrics: ChurnMetrics,
    pub logger: StructuredLogger,
    pub high_risk_threshold: f64,
}

/// Identity forwarded by the upstream authentication layer
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: String,
    pub role: Option<String>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        Ok(Caller {
            user_id,
            role: header_value(parts, USER_ROLE_HEADER),
        })
    }
}

/// Score one customer record
async fn predict(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> ApiResult<ApiResponse<PredictionRecord>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("No data provided".to_string()));
    }
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    let customer = CustomerRecord::try_from(value)
        .map_err(|_| ApiError::BadRequest("Customer data must be a JSON object".to_string()))?;

    let record = state.service.predict(&caller.user_id, customer).await?;
    Ok(ApiResponse::ok(record))
}

async fn history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<HistoryParams>,
) -> ApiResult<ApiResponse<HistoryPage>> {
    let query = HistoryQuery::try_from(params)?;
    let page = state
        .service
        .store()
        .find_by_user(&caller.user_id, &query)
        .await?;
    Ok(ApiResponse::ok(page))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurgeResult {
    deleted_count: u64,
}

/// Delete every user's history
async fn clear_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<ApiResponse<PurgeResult>> {
    if !caller.is_admin() {
        return Err(ApiError::Forbidden);
    }
    let deleted_count = state.service.store().purge().await?;
    info!(user_id = %caller.user_id, deleted_count = deleted_count, "Prediction history purged");
    Ok(ApiResponse::ok(PurgeResult { deleted_count }).with_message("History cleared successfully"))
}

async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<ApiResponse<DashboardStats>> {
    let records = state.service.store().all_for_user(&caller.user_id).await?;
    Ok(ApiResponse::ok(DashboardStats::from_records(
        &records,
        state.high_risk_threshold,
    )))
}

async fn get_notification_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResponse<NotificationSettings> {
    ApiResponse::ok(state.notifications.get(&caller.user_id))
}

async fn put_notification_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> ApiResult<ApiResponse<NotificationSettings>> {
    let settings: NotificationSettings = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid notification settings: {}", e)))?;
    state.notifications.set(&caller.user_id, settings.clone())?;
    info!(
        user_id = %caller.user_id,
        email_enabled = settings.email_enabled,
        sms_enabled = settings.sms_enabled,
        threshold = settings.threshold,
        "Notification settings updated"
    );
    Ok(ApiResponse::ok(settings).with_message("Notification settings saved"))
}

/// Service summary in the shape dashboards poll
async fn api_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match state.service.store().count().await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };
    let models = if state.service.registry().is_ready() {
        "loaded"
    } else {
        "not loaded"
    };
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database,
        "models": models,
    }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once artifacts are loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let body = render_metrics().map_err(|e| ApiError::internal("Failed to render metrics", e))?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        body,
    ))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/history", get(history).delete(clear_history))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route(
            "/api/notifications/settings",
            get(get_notification_settings).put(put_notification_settings),
        )
        .route("/api/health", get(api_health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

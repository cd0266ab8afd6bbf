//! HTTP request handlers.
//!
//! Every route answers the envelope `{success, data?, count?, message?}` on
//! success and `{success: false, error: {message}}` on failure, except
//! `/health` which serves its snapshot unwrapped for load balancers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use ratehub_types::{
    AppError, ConvertParams, CreateIntegrationRequest, HealthResponse, HistoryParams,
    IntegrationId, ListIntegrationsParams, ListRatesParams, PopularPairsParams, RateRepository,
    RecentConversionsParams, RequestLogParams, RequestStatsParams, UpdateIntegrationRequest,
    UsageWindowParams,
};

use crate::{IntegrationService, PollingScheduler, RatesService, UsageService};

/// Application state shared across handlers.
pub struct AppState<R: RateRepository> {
    pub rates: RatesService<R>,
    pub integrations: IntegrationService<R>,
    pub usage: UsageService<R>,
    pub scheduler: Arc<PollingScheduler<R>>,
    /// "connected" when an external cache backend is in use, "fallback"
    /// for the in-process cache.
    pub cache_status: String,
    pub started_at: Instant,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "success": false,
            "error": { "message": message }
        });

        (status, Json(body)).into_response()
    }
}

/// Envelopes a single payload.
fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "data": data }))
}

/// Envelopes a collection, adding its length as `count`.
fn ok_list<T: Serialize>(items: Vec<T>) -> Json<serde_json::Value> {
    let count = items.len();
    Json(serde_json::json!({ "success": true, "data": items, "count": count }))
}

/// Envelopes a bare confirmation.
fn ok_message(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "message": message }))
}

fn parse_integration_id(id: &str) -> Result<IntegrationId, AppError> {
    id.parse()
        .map_err(|_| AppError::BadRequest("Invalid integration ID".into()))
}

/// Nudges the scheduler after a management mutation so the change takes
/// effect without waiting for the periodic resync. Failures are logged;
/// the resync timer recovers on its own.
async fn resync_scheduler<R: RateRepository>(state: &AppState<R>) {
    if let Err(e) = state.scheduler.resync().await {
        tracing::warn!(error = %e, "Scheduler resync after mutation failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check endpoint. Served unwrapped.
pub async fn health<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    let scheduler = state.scheduler.status().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        scheduler,
        cache: state.cache_status.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Integrations
// ─────────────────────────────────────────────────────────────────────────────

/// Static catalog of supported providers.
pub async fn list_providers() -> impl IntoResponse {
    ok_list(ratehub_providers::supported_providers())
}

#[tracing::instrument(skip(state, req), fields(name = %req.name, provider = %req.provider))]
pub async fn create_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateIntegrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let integration = state.integrations.create(req).await?;
    resync_scheduler(&state).await;
    Ok((StatusCode::CREATED, ok(integration)))
}

#[tracing::instrument(skip(state))]
pub async fn list_integrations<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<ListIntegrationsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let integrations = state.integrations.list(params).await?;
    Ok(ok_list(integrations))
}

#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn get_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    let integration = state.integrations.get(id).await?;
    Ok(ok(integration))
}

#[tracing::instrument(skip(state, req), fields(integration_id = %id))]
pub async fn update_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateIntegrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    let integration = state.integrations.update(id, req).await?;
    resync_scheduler(&state).await;
    Ok(ok(integration))
}

/// Soft delete: deactivates the integration and unschedules it.
#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn deactivate_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    state.integrations.deactivate(id).await?;
    resync_scheduler(&state).await;
    Ok(ok_message("Integration deactivated"))
}

/// Hard delete: removes the integration entirely.
#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn delete_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    state.integrations.delete(id).await?;
    resync_scheduler(&state).await;
    Ok(ok_message("Integration permanently deleted"))
}

#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn integration_usage<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(params): Query<UsageWindowParams>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    let usage = state.usage.integration_usage(id, params.days).await?;
    Ok(ok(usage))
}

/// Runs the integration's fetch immediately, without touching its timer.
#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn trigger_integration<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    state.scheduler.trigger(id).await?;
    Ok(ok_message("Fetch triggered"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Rates & conversion
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn list_currencies<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = state.rates.currencies().await?;
    Ok(ok_list(currencies))
}

#[tracing::instrument(skip(state))]
pub async fn list_latest_rates<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<ListRatesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state.rates.list_latest(params).await?;
    Ok(ok_list(rates))
}

#[tracing::instrument(skip(state))]
pub async fn rate_history<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.rates.history(params).await?;
    Ok(ok_list(entries))
}

#[tracing::instrument(skip(state), fields(from = ?params.from, to = ?params.to, amount = ?params.amount))]
pub async fn convert<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<ConvertParams>,
) -> Result<impl IntoResponse, ApiError> {
    let conversion = state.rates.convert(params).await?;
    Ok(ok(conversion))
}

// ─────────────────────────────────────────────────────────────────────────────
// Monitoring
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn monitoring_usage<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<UsageWindowParams>,
) -> Result<impl IntoResponse, ApiError> {
    let usage = state.usage.aggregated(params.days).await?;
    Ok(ok_list(usage))
}

pub async fn scheduler_status<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    ok(state.scheduler.status().await)
}

#[tracing::instrument(skip(state))]
pub async fn recent_requests<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<RequestLogParams>,
) -> Result<impl IntoResponse, ApiError> {
    let integration_id = params.integration_id.map(IntegrationId::from_uuid);
    let entries = state
        .usage
        .recent_requests(integration_id, params.limit)
        .await?;
    Ok(ok_list(entries))
}

#[tracing::instrument(skip(state), fields(integration_id = %id))]
pub async fn request_stats<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(params): Query<RequestStatsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_integration_id(&id)?;
    let stats = state.usage.request_stats(id, params.hours).await?;
    Ok(ok(stats))
}

#[tracing::instrument(skip(state))]
pub async fn recent_conversions<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<RecentConversionsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let conversions = state.usage.recent_conversions(params.limit).await?;
    Ok(ok_list(conversions))
}

#[tracing::instrument(skip(state))]
pub async fn popular_pairs<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<PopularPairsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let pairs = state.usage.popular_pairs(params.days, params.limit).await?;
    Ok(ok_list(pairs))
}

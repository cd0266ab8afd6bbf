//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use ratehub_types::domain::{
    AggregatedUsage, ConversionLogEntry, IntegrationId, PopularPair, ProviderKind,
    RateHistoryEntry, RequestLogEntry, RequestStats, UsageRecord,
};
use ratehub_types::dto::{
    ConversionResponse, CreateIntegrationRequest, HealthResponse, IntegrationResponse,
    IntegrationUsageResponse, LatestRateResponse, ProviderInfo, ScheduledJobInfo,
    SchedulerStatusResponse, UpdateIntegrationRequest,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health snapshot", body = HealthResponse)
    )
)]
async fn health() {}

/// Static catalog of supported providers
#[utoipa::path(
    get,
    path = "/api/integrations/providers",
    tag = "integrations",
    responses(
        (status = 200, description = "Supported provider catalog", body = Vec<ProviderInfo>)
    )
)]
async fn list_providers() {}

/// Create an integration
#[utoipa::path(
    post,
    path = "/api/integrations",
    tag = "integrations",
    request_body = CreateIntegrationRequest,
    responses(
        (status = 201, description = "Integration created and scheduled", body = IntegrationResponse),
        (status = 400, description = "Invalid name, provider, URL, priority, or poll interval")
    )
)]
async fn create_integration() {}

/// List integrations
#[utoipa::path(
    get,
    path = "/api/integrations",
    tag = "integrations",
    params(
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
        ("provider" = Option<String>, Query, description = "Filter by provider kind")
    ),
    responses(
        (status = 200, description = "Integrations, priority first", body = Vec<IntegrationResponse>)
    )
)]
async fn list_integrations() {}

/// Get integration by ID
#[utoipa::path(
    get,
    path = "/api/integrations/{id}",
    tag = "integrations",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)")
    ),
    responses(
        (status = 200, description = "Integration details", body = IntegrationResponse),
        (status = 404, description = "Integration not found")
    )
)]
async fn get_integration() {}

/// Partially update an integration
#[utoipa::path(
    put,
    path = "/api/integrations/{id}",
    tag = "integrations",
    request_body = UpdateIntegrationRequest,
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)")
    ),
    responses(
        (status = 200, description = "Updated integration", body = IntegrationResponse),
        (status = 400, description = "No fields to update, or a field failed validation"),
        (status = 404, description = "Integration not found")
    )
)]
async fn update_integration() {}

/// Deactivate an integration (soft delete)
#[utoipa::path(
    delete,
    path = "/api/integrations/{id}",
    tag = "integrations",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)")
    ),
    responses(
        (status = 200, description = "Integration deactivated and unscheduled"),
        (status = 404, description = "Integration not found")
    )
)]
async fn deactivate_integration() {}

/// Permanently delete an integration
#[utoipa::path(
    delete,
    path = "/api/integrations/{id}/permanent",
    tag = "integrations",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)")
    ),
    responses(
        (status = 200, description = "Integration removed"),
        (status = 404, description = "Integration not found")
    )
)]
async fn delete_integration() {}

/// Usage rollup for one integration
#[utoipa::path(
    get,
    path = "/api/integrations/{id}/usage",
    tag = "integrations",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)"),
        ("days" = Option<i64>, Query, description = "History window in days, default 30")
    ),
    responses(
        (status = 200, description = "Today's usage plus daily history", body = IntegrationUsageResponse),
        (status = 404, description = "Integration not found")
    )
)]
async fn integration_usage() {}

/// Trigger an immediate fetch
#[utoipa::path(
    post,
    path = "/api/integrations/{id}/trigger",
    tag = "integrations",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)")
    ),
    responses(
        (status = 200, description = "Fetch executed"),
        (status = 404, description = "Integration is not scheduled")
    )
)]
async fn trigger_integration() {}

/// Currencies observed in the latest-rate table
#[utoipa::path(
    get,
    path = "/api/rates/currencies",
    tag = "rates",
    responses(
        (status = 200, description = "Sorted union of bases and targets", body = Vec<String>)
    )
)]
async fn list_currencies() {}

/// Latest rates
#[utoipa::path(
    get,
    path = "/api/rates/latest",
    tag = "rates",
    params(
        ("base" = Option<String>, Query, description = "Filter by base currency"),
        ("target" = Option<String>, Query, description = "Filter by target currency"),
        ("q" = Option<String>, Query, description = "Substring match against pair keys")
    ),
    responses(
        (status = 200, description = "Latest rates, most recent first (cap 100)", body = Vec<LatestRateResponse>)
    )
)]
async fn list_latest_rates() {}

/// Historical rates for one pair
#[utoipa::path(
    get,
    path = "/api/rates/history",
    tag = "rates",
    params(
        ("base" = String, Query, description = "Base currency (required)"),
        ("target" = String, Query, description = "Target currency (required)"),
        ("start_date" = Option<String>, Query, description = "Inclusive start, YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "Inclusive end, YYYY-MM-DD"),
        ("limit" = Option<i64>, Query, description = "Row cap, default 1000")
    ),
    responses(
        (status = 200, description = "History rows, most recent first", body = Vec<RateHistoryEntry>),
        (status = 400, description = "Missing base/target or malformed date")
    )
)]
async fn rate_history() {}

/// Convert an amount between currencies
#[utoipa::path(
    get,
    path = "/api/convert",
    tag = "conversion",
    params(
        ("from" = String, Query, description = "Source currency code"),
        ("to" = String, Query, description = "Target currency code"),
        ("amount" = f64, Query, description = "Positive amount to convert")
    ),
    responses(
        (status = 200, description = "Conversion result with freshness metadata", body = ConversionResponse),
        (status = 400, description = "Invalid code or amount"),
        (status = 404, description = "No direct or cross rate for the pair")
    )
)]
async fn convert() {}

/// Aggregated usage across integrations
#[utoipa::path(
    get,
    path = "/api/monitoring/usage",
    tag = "monitoring",
    params(
        ("days" = Option<i64>, Query, description = "Trailing window in days, default 7")
    ),
    responses(
        (status = 200, description = "Per-integration call totals and last errors", body = Vec<AggregatedUsage>)
    )
)]
async fn monitoring_usage() {}

/// Scheduler status
#[utoipa::path(
    get,
    path = "/api/monitoring/scheduler",
    tag = "monitoring",
    responses(
        (status = 200, description = "Running flag and live job table", body = SchedulerStatusResponse)
    )
)]
async fn scheduler_status() {}

/// Recent provider fetch outcomes
#[utoipa::path(
    get,
    path = "/api/monitoring/requests",
    tag = "monitoring",
    params(
        ("integration_id" = Option<IntegrationId>, Query, description = "Filter by integration"),
        ("limit" = Option<i64>, Query, description = "Row cap, default 100")
    ),
    responses(
        (status = 200, description = "Request log entries, newest first", body = Vec<RequestLogEntry>)
    )
)]
async fn recent_requests() {}

/// Request statistics for one integration
#[utoipa::path(
    get,
    path = "/api/monitoring/requests/stats/{id}",
    tag = "monitoring",
    params(
        ("id" = IntegrationId, Path, description = "Integration ID (UUID)"),
        ("hours" = Option<i64>, Query, description = "Trailing window in hours, default 24")
    ),
    responses(
        (status = 200, description = "Success/failure/latency rollup", body = RequestStats)
    )
)]
async fn request_stats() {}

/// Recently served conversions
#[utoipa::path(
    get,
    path = "/api/monitoring/conversions",
    tag = "monitoring",
    params(
        ("limit" = Option<i64>, Query, description = "Row cap, default 50")
    ),
    responses(
        (status = 200, description = "Conversion log entries, newest first", body = Vec<ConversionLogEntry>)
    )
)]
async fn recent_conversions() {}

/// Most converted pairs
#[utoipa::path(
    get,
    path = "/api/monitoring/conversions/popular",
    tag = "monitoring",
    params(
        ("days" = Option<i64>, Query, description = "Trailing window in days, default 7"),
        ("limit" = Option<i64>, Query, description = "Row cap, default 10")
    ),
    responses(
        (status = 200, description = "Pair conversion counts", body = Vec<PopularPair>)
    )
)]
async fn popular_pairs() {}

/// OpenAPI documentation for the RateHub API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "RateHub Exchange Rate Service API",
        version = "1.0.0",
        description = "Polls configured exchange-rate providers on per-integration schedules, stores latest and historical rates, and serves conversions with cross-rate fallback through anchor currencies.\n\nAll endpoints except `/health` wrap their payload in `{\"success\": true, \"data\": ...}`; errors come back as `{\"success\": false, \"error\": {\"message\": ...}}`.",
        license(name = "MIT"),
    ),
    paths(
        health,
        list_providers,
        create_integration,
        list_integrations,
        get_integration,
        update_integration,
        deactivate_integration,
        delete_integration,
        integration_usage,
        trigger_integration,
        list_currencies,
        list_latest_rates,
        rate_history,
        convert,
        monitoring_usage,
        scheduler_status,
        recent_requests,
        request_stats,
        recent_conversions,
        popular_pairs,
    ),
    components(
        schemas(
            CreateIntegrationRequest,
            UpdateIntegrationRequest,
            IntegrationResponse,
            ProviderInfo,
            ProviderKind,
            IntegrationId,
            IntegrationUsageResponse,
            UsageRecord,
            LatestRateResponse,
            RateHistoryEntry,
            ConversionResponse,
            AggregatedUsage,
            RequestLogEntry,
            RequestStats,
            ConversionLogEntry,
            PopularPair,
            ScheduledJobInfo,
            SchedulerStatusResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "integrations", description = "Provider integration management"),
        (name = "rates", description = "Latest and historical rate queries"),
        (name = "conversion", description = "Currency conversion"),
        (name = "monitoring", description = "Usage, request log, and scheduler visibility"),
    )
)]
pub struct ApiDoc;

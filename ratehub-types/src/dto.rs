//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    CurrencyCode, Integration, IntegrationId, LatestRate, ProviderKind, UsageRecord,
};

// ─────────────────────────────────────────────────────────────────────────────
// Integration DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an integration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateIntegrationRequest {
    /// Display name
    #[schema(example = "Primary ExchangeRate-API")]
    pub name: String,
    /// Provider kind string, case-insensitive
    #[schema(example = "exchangerate-api")]
    pub provider: String,
    /// Base endpoint URL
    #[schema(example = "https://v6.exchangerate-api.com")]
    pub base_url: String,
    /// Credential; stored encrypted, never returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Display ordering, 1-100; defaults to 100
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 10)]
    pub priority: Option<i64>,
    /// Seconds between polls, 60-3600; defaults to 300
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 300)]
    pub poll_interval_seconds: Option<i64>,
    /// Defaults to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Partial update to an integration. Omitted fields are left unchanged;
/// an empty-string `api_key` clears the stored credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateIntegrationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// An integration as served to clients. Credentials never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntegrationResponse {
    pub id: IntegrationId,
    #[schema(example = "Primary ExchangeRate-API")]
    pub name: String,
    pub provider: ProviderKind,
    #[schema(example = "https://v6.exchangerate-api.com")]
    pub base_url: String,
    pub priority: i64,
    pub poll_interval_seconds: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Integration> for IntegrationResponse {
    fn from(i: Integration) -> Self {
        Self {
            id: i.id,
            name: i.name,
            provider: i.provider,
            base_url: i.base_url,
            priority: i.priority,
            poll_interval_seconds: i.poll_interval_seconds,
            active: i.active,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

/// Static catalog entry describing a supported provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderInfo {
    pub kind: ProviderKind,
    #[schema(example = "ExchangeRate-API")]
    pub display_name: String,
    #[schema(example = "https://v6.exchangerate-api.com")]
    pub default_base_url: String,
    #[schema(example = 1500)]
    pub free_tier_limit: i64,
    pub description: String,
}

/// Usage rollup for one integration: today plus a daily history window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntegrationUsageResponse {
    pub today: Option<UsageRecord>,
    pub history: Vec<UsageRecord>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A latest-rate row as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestRateResponse {
    /// Pair key, `BASE-TARGET`
    #[schema(example = "USD-EUR")]
    pub pair: String,
    #[schema(value_type = String, example = "USD")]
    pub base: CurrencyCode,
    #[schema(value_type = String, example = "EUR")]
    pub target: CurrencyCode,
    #[schema(example = 0.92)]
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    pub source_integration_id: Option<IntegrationId>,
}

impl From<LatestRate> for LatestRateResponse {
    fn from(r: LatestRate) -> Self {
        Self {
            pair: r.pair().key(),
            base: r.base,
            target: r.target,
            rate: r.rate,
            fetched_at: r.fetched_at,
            source_integration_id: r.source_integration_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A served conversion, with freshness metadata.
///
/// `via` and `cross_rate` are present only when the rate was composed
/// through an anchor currency; `stale`/`warning` only when the underlying
/// data is more than an hour old.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversionResponse {
    #[schema(value_type = String, example = "THB")]
    pub from: CurrencyCode,
    #[schema(value_type = String, example = "EUR")]
    pub to: CurrencyCode,
    #[schema(example = 350.0)]
    pub amount: f64,
    #[schema(example = 9.0)]
    pub result: f64,
    #[schema(example = 0.02571)]
    pub rate: f64,
    /// Timestamp of the underlying data (direct), or of the computation
    /// (same-currency and cross-rate)
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_age_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "just now")]
    pub data_age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Anchor currency the rate was composed through
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "USD")]
    pub via: Option<CurrencyCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_rate: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler & monitoring DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// One live scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduledJobInfo {
    pub id: IntegrationId,
    #[schema(example = "Primary ExchangeRate-API")]
    pub name: String,
    pub provider: ProviderKind,
    #[schema(example = 300)]
    pub interval_seconds: i64,
}

/// Scheduler status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulerStatusResponse {
    pub running: bool,
    pub active_jobs: usize,
    pub jobs: Vec<ScheduledJobInfo>,
}

/// Service health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub scheduler: SchedulerStatusResponse,
    /// "connected" when an external cache backend is in use, "fallback"
    /// for the in-process cache
    #[schema(example = "connected")]
    pub cache: String,
    pub uptime_seconds: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Query parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters for listing integrations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListIntegrationsParams {
    pub active: Option<bool>,
    pub provider: Option<String>,
}

/// Query parameters for listing latest rates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRatesParams {
    pub base: Option<String>,
    pub target: Option<String>,
    /// Substring match against pair keys
    pub q: Option<String>,
}

/// Query parameters for historical rates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    pub base: Option<String>,
    pub target: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for a conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<f64>,
}

/// Trailing-window parameter shared by usage views.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageWindowParams {
    pub days: Option<i64>,
}

/// Query parameters for the request log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestLogParams {
    pub integration_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Query parameters for request statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestStatsParams {
    pub hours: Option<i64>,
}

/// Query parameters for recent conversions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentConversionsParams {
    pub limit: Option<i64>,
}

/// Query parameters for popular pairs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopularPairsParams {
    pub days: Option<i64>,
    pub limit: Option<i64>,
}

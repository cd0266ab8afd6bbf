//! Usage and observability records populated by the scheduler and the
//! conversion path.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::currency::CurrencyCode;
use super::integration::{IntegrationId, ProviderKind};

/// Per-(integration, day) usage accumulator.
///
/// `calls_made` grows monotonically within the day; the provider-reported
/// fields stay whatever the provider last told us (they are nullable because
/// not every provider exposes them).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageRecord {
    pub integration_id: IntegrationId,
    pub date: NaiveDate,
    pub calls_made: i64,
    pub calls_limit: Option<i64>,
    pub calls_remaining: Option<i64>,
    pub reset_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Cross-integration usage rollup for the monitoring surface.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AggregatedUsage {
    pub id: IntegrationId,
    pub name: String,
    pub provider: ProviderKind,
    pub active: bool,
    pub total_calls: i64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// One provider fetch attempt outcome, appended by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestLogEntry {
    pub id: i64,
    pub integration_id: IntegrationId,
    pub success: bool,
    pub response_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request-log rollup over a time window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestStats {
    pub total: i64,
    pub successes: i64,
    pub failures: i64,
    pub avg_response_ms: Option<f64>,
}

/// One served conversion, appended fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversionLogEntry {
    pub id: i64,
    #[serde(rename = "from")]
    #[schema(value_type = String, example = "USD")]
    pub from_currency: CurrencyCode,
    #[serde(rename = "to")]
    #[schema(value_type = String, example = "EUR")]
    pub to_currency: CurrencyCode,
    pub amount: f64,
    pub result: f64,
    pub rate: f64,
    pub created_at: DateTime<Utc>,
}

/// Conversion count for a pair over a window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PopularPair {
    #[serde(rename = "from")]
    #[schema(value_type = String, example = "USD")]
    pub from_currency: CurrencyCode,
    #[serde(rename = "to")]
    #[schema(value_type = String, example = "EUR")]
    pub to_currency: CurrencyCode,
    pub conversions: i64,
}

//! Rate provider port.
//!
//! This trait defines the interface for external rate sources.
//! Implementations are HTTP clients for real providers plus a deterministic
//! mock for testing and demos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CurrencyCode, RateSnapshot};

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider rejected request: {0}")]
    Api(String),

    #[error("Unsupported base currency: {0}")]
    UnsupportedBase(CurrencyCode),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Provider-reported quota state. All fields are nullable because most
/// providers expose none of this on their free tiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub calls_remaining: Option<i64>,
    pub limit: Option<i64>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Port trait for external rate sources.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the latest rates quoted against `base`, normalized into a
    /// [`RateSnapshot`]. Retries transient failures internally per the
    /// shared bounded-backoff policy.
    async fn fetch_latest_rates(&self, base: &CurrencyCode)
    -> Result<RateSnapshot, ProviderError>;

    /// Quota state as last reported by the provider.
    async fn usage_metrics(&self) -> UsageMetrics;

    /// Smoke test: fetches USD rates and reports success without
    /// propagating the error.
    async fn health_check(&self) -> bool {
        self.fetch_latest_rates(&CurrencyCode::usd()).await.is_ok()
    }
}

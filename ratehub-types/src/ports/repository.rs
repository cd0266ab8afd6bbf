//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite) will implement this trait.

use chrono::NaiveDate;

use crate::domain::{
    AggregatedUsage, ConversionLogEntry, CurrencyCode, CurrencyPair, Integration, IntegrationId,
    IntegrationUpdate, LatestRate, NewIntegration, PopularPair, ProviderKind, RateHistoryEntry,
    RequestLogEntry, RequestStats, UsageRecord,
};
use crate::error::RepoError;
use crate::ports::provider::UsageMetrics;

/// Filter for integration listings.
#[derive(Debug, Clone, Default)]
pub struct IntegrationFilter {
    pub active: Option<bool>,
    pub provider: Option<ProviderKind>,
}

/// Filter for latest-rate listings.
#[derive(Debug, Clone, Default)]
pub struct RateFilter {
    pub base: Option<CurrencyCode>,
    pub target: Option<CurrencyCode>,
    /// Substring match against the pair key
    pub search: Option<String>,
}

/// Query for historical rates. Both end dates are inclusive.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: i64,
}

/// The main repository port for the rate hub.
///
/// Credential handling is the store's responsibility: writes receive
/// plaintext keys and encrypt them at rest, credentialed reads return
/// them decrypted.
#[async_trait::async_trait]
pub trait RateRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Integration configuration
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a new integration.
    async fn create_integration(&self, data: NewIntegration) -> Result<Integration, RepoError>;

    /// Gets an integration by ID, credential decrypted.
    async fn get_integration(&self, id: IntegrationId)
    -> Result<Option<Integration>, RepoError>;

    /// Lists integrations (priority ascending, then newest first).
    /// Credentials are never populated here.
    async fn list_integrations(
        &self,
        filter: IntegrationFilter,
    ) -> Result<Vec<Integration>, RepoError>;

    /// Applies a partial update. Fails with `NotFound` for unknown ids.
    async fn update_integration(
        &self,
        id: IntegrationId,
        update: IntegrationUpdate,
    ) -> Result<Integration, RepoError>;

    /// Soft delete: clears the active flag.
    async fn deactivate_integration(&self, id: IntegrationId) -> Result<(), RepoError>;

    /// Hard delete: removes the row.
    async fn delete_integration(&self, id: IntegrationId) -> Result<(), RepoError>;

    /// Active integrations with decrypted credentials, for the scheduler.
    async fn list_active_integrations(&self) -> Result<Vec<Integration>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Rates
    // ─────────────────────────────────────────────────────────────────────────────

    /// Idempotent upsert keyed by pair; always overwrites.
    async fn upsert_latest(&self, rate: &LatestRate) -> Result<(), RepoError>;

    /// Plain insert; every fetch appends, duplicates expected.
    async fn append_history(&self, rate: &LatestRate) -> Result<(), RepoError>;

    /// Point read of the latest rate for a pair.
    async fn get_latest(&self, pair: &CurrencyPair) -> Result<Option<LatestRate>, RepoError>;

    /// Filtered listing, most recently fetched first, capped at 100.
    async fn list_latest(&self, filter: RateFilter) -> Result<Vec<LatestRate>, RepoError>;

    /// Historical rates, most recent first.
    async fn get_history(&self, query: HistoryQuery) -> Result<Vec<RateHistoryEntry>, RepoError>;

    /// Sorted union of all bases and targets observed in the latest table.
    async fn list_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Usage & telemetry
    // ─────────────────────────────────────────────────────────────────────────────

    /// Accumulates calls for today and refreshes provider-reported metrics
    /// (nullable metrics keep their previous value).
    async fn record_usage(
        &self,
        integration_id: IntegrationId,
        calls_made: i64,
        metrics: &UsageMetrics,
    ) -> Result<(), RepoError>;

    /// Records the last error for today without touching call counts.
    async fn record_usage_error(
        &self,
        integration_id: IntegrationId,
        message: &str,
    ) -> Result<(), RepoError>;

    /// Daily usage rows for one integration, newest first.
    async fn usage_stats(
        &self,
        integration_id: IntegrationId,
        days: i64,
    ) -> Result<Vec<UsageRecord>, RepoError>;

    /// Today's usage row, if any.
    async fn today_usage(
        &self,
        integration_id: IntegrationId,
    ) -> Result<Option<UsageRecord>, RepoError>;

    /// Rollup across all integrations over a trailing window.
    async fn aggregated_usage(&self, days: i64) -> Result<Vec<AggregatedUsage>, RepoError>;

    /// Appends one provider fetch outcome.
    async fn log_request(
        &self,
        integration_id: IntegrationId,
        success: bool,
        response_time_ms: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), RepoError>;

    /// Recent request-log entries, newest first.
    async fn recent_requests(
        &self,
        integration_id: Option<IntegrationId>,
        limit: i64,
    ) -> Result<Vec<RequestLogEntry>, RepoError>;

    /// Request statistics for one integration over a trailing window.
    async fn request_stats(
        &self,
        integration_id: IntegrationId,
        hours: i64,
    ) -> Result<RequestStats, RepoError>;

    /// Appends one served conversion.
    async fn log_conversion(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: f64,
        result: f64,
        rate: f64,
    ) -> Result<(), RepoError>;

    /// Recent conversions, newest first.
    async fn recent_conversions(&self, limit: i64)
    -> Result<Vec<ConversionLogEntry>, RepoError>;

    /// Most frequently converted pairs over a trailing window.
    async fn popular_pairs(&self, days: i64, limit: i64) -> Result<Vec<PopularPair>, RepoError>;
}

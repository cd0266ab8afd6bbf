//! Shared database row types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use ratehub_types::{
    AggregatedUsage, ConversionLogEntry, CurrencyCode, Integration, IntegrationId, LatestRate,
    PopularPair, ProviderKind, RateHistoryEntry, RepoError, RequestLogEntry, RequestStats,
    UsageRecord,
};

use crate::crypto::CredentialCipher;

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, NaiveDate, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn parse_provider(s: &str) -> Result<ProviderKind, RepoError> {
    ProviderKind::parse(s).map_err(|_| RepoError::Database(format!("Unknown provider: {s}")))
}

pub(crate) fn parse_code(s: &str) -> Result<CurrencyCode, RepoError> {
    CurrencyCode::parse(s)
        .map_err(|_| RepoError::Database(format!("Invalid currency code: {s}")))
}

#[cfg(feature = "sqlite")]
fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
fn parse_date(s: &str) -> Result<chrono::NaiveDate, RepoError> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Integration row from database.
#[derive(FromRow)]
pub struct DbIntegration {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub provider: String,
    pub base_url: String,
    pub api_key_enc: Option<String>,
    pub priority: i64,
    pub poll_interval_seconds: i64,

    #[cfg(not(feature = "sqlite"))]
    pub active: bool,
    #[cfg(feature = "sqlite")]
    pub active: i64,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub updated_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub updated_at: String,
}

impl DbIntegration {
    /// Convert database row to domain Integration.
    ///
    /// The credential is decrypted only when a cipher is supplied; listing
    /// paths pass `None` and never materialize plaintext keys.
    pub fn into_domain(
        self,
        cipher: Option<&CredentialCipher>,
    ) -> Result<Integration, RepoError> {
        let provider = parse_provider(&self.provider)?;

        let api_key = match (cipher, &self.api_key_enc) {
            (Some(cipher), Some(stored)) => Some(cipher.decrypt(stored)?),
            _ => None,
        };

        #[cfg(not(feature = "sqlite"))]
        let (id, active, created_at, updated_at) = (
            IntegrationId::from_uuid(self.id),
            self.active,
            self.created_at,
            self.updated_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, active, created_at, updated_at) = (
            IntegrationId::from_uuid(parse_uuid(&self.id)?),
            self.active != 0,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        );

        Ok(Integration::from_parts(
            id,
            self.name,
            provider,
            self.base_url,
            api_key,
            self.priority,
            self.poll_interval_seconds,
            active,
            created_at,
            updated_at,
        ))
    }
}

/// Latest-rate row from database.
#[derive(FromRow)]
pub struct DbLatestRate {
    pub base: String,
    pub target: String,
    pub rate: f64,

    #[cfg(not(feature = "sqlite"))]
    pub fetched_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub fetched_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub source_integration_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub source_integration_id: Option<String>,
}

impl DbLatestRate {
    /// Convert database row to domain LatestRate.
    pub fn into_domain(self) -> Result<LatestRate, RepoError> {
        let base = parse_code(&self.base)?;
        let target = parse_code(&self.target)?;

        #[cfg(not(feature = "sqlite"))]
        let (fetched_at, source_integration_id) = (
            self.fetched_at,
            self.source_integration_id.map(IntegrationId::from_uuid),
        );

        #[cfg(feature = "sqlite")]
        let (fetched_at, source_integration_id) = (
            parse_timestamp(&self.fetched_at)?,
            self.source_integration_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(IntegrationId::from_uuid),
        );

        Ok(LatestRate {
            base,
            target,
            rate: self.rate,
            fetched_at,
            source_integration_id,
        })
    }
}

/// History row from database.
#[derive(FromRow)]
pub struct DbHistoryRow {
    pub id: i64,
    pub base: String,
    pub target: String,
    pub rate: f64,

    #[cfg(not(feature = "sqlite"))]
    pub fetched_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub fetched_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub source_integration_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub source_integration_id: Option<String>,
}

impl DbHistoryRow {
    /// Convert database row to domain RateHistoryEntry.
    pub fn into_domain(self) -> Result<RateHistoryEntry, RepoError> {
        let base = parse_code(&self.base)?;
        let target = parse_code(&self.target)?;

        #[cfg(not(feature = "sqlite"))]
        let (fetched_at, source_integration_id) = (
            self.fetched_at,
            self.source_integration_id.map(IntegrationId::from_uuid),
        );

        #[cfg(feature = "sqlite")]
        let (fetched_at, source_integration_id) = (
            parse_timestamp(&self.fetched_at)?,
            self.source_integration_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(IntegrationId::from_uuid),
        );

        Ok(RateHistoryEntry {
            id: self.id,
            base,
            target,
            rate: self.rate,
            fetched_at,
            source_integration_id,
        })
    }
}

/// Currency-only row for distinct-code queries.
#[derive(FromRow)]
pub struct DbCurrencyRow {
    pub code: String,
}

/// Daily usage row from database.
#[derive(FromRow)]
pub struct DbUsageRow {
    #[cfg(not(feature = "sqlite"))]
    pub integration_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub integration_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub date: NaiveDate,
    #[cfg(feature = "sqlite")]
    pub date: String,

    pub calls_made: i64,
    pub calls_limit: Option<i64>,
    pub calls_remaining: Option<i64>,

    #[cfg(not(feature = "sqlite"))]
    pub reset_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub reset_at: Option<String>,

    pub last_error: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub last_error_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_error_at: Option<String>,
}

impl DbUsageRow {
    /// Convert database row to domain UsageRecord.
    pub fn into_domain(self) -> Result<UsageRecord, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (integration_id, date, reset_at, last_error_at) = (
            IntegrationId::from_uuid(self.integration_id),
            self.date,
            self.reset_at,
            self.last_error_at,
        );

        #[cfg(feature = "sqlite")]
        let (integration_id, date, reset_at, last_error_at) = (
            IntegrationId::from_uuid(parse_uuid(&self.integration_id)?),
            parse_date(&self.date)?,
            self.reset_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            self.last_error_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        );

        Ok(UsageRecord {
            integration_id,
            date,
            calls_made: self.calls_made,
            calls_limit: self.calls_limit,
            calls_remaining: self.calls_remaining,
            reset_at,
            last_error: self.last_error,
            last_error_at,
        })
    }
}

/// Cross-integration usage rollup row.
#[derive(FromRow)]
pub struct DbAggregatedUsageRow {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub provider: String,

    #[cfg(not(feature = "sqlite"))]
    pub active: bool,
    #[cfg(feature = "sqlite")]
    pub active: i64,

    pub total_calls: i64,
    pub last_error: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub last_error_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_error_at: Option<String>,
}

impl DbAggregatedUsageRow {
    /// Convert database row to domain AggregatedUsage.
    pub fn into_domain(self) -> Result<AggregatedUsage, RepoError> {
        let provider = parse_provider(&self.provider)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, active, last_error_at) = (
            IntegrationId::from_uuid(self.id),
            self.active,
            self.last_error_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, active, last_error_at) = (
            IntegrationId::from_uuid(parse_uuid(&self.id)?),
            self.active != 0,
            self.last_error_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        );

        Ok(AggregatedUsage {
            id,
            name: self.name,
            provider,
            active,
            total_calls: self.total_calls,
            last_error: self.last_error,
            last_error_at,
        })
    }
}

/// Request-log row from database.
#[derive(FromRow)]
pub struct DbRequestLogRow {
    pub id: i64,

    #[cfg(not(feature = "sqlite"))]
    pub integration_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub integration_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub success: bool,
    #[cfg(feature = "sqlite")]
    pub success: i64,

    pub response_time_ms: Option<i64>,
    pub error_message: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbRequestLogRow {
    /// Convert database row to domain RequestLogEntry.
    pub fn into_domain(self) -> Result<RequestLogEntry, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (integration_id, success, created_at) = (
            IntegrationId::from_uuid(self.integration_id),
            self.success,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (integration_id, success, created_at) = (
            IntegrationId::from_uuid(parse_uuid(&self.integration_id)?),
            self.success != 0,
            parse_timestamp(&self.created_at)?,
        );

        Ok(RequestLogEntry {
            id: self.id,
            integration_id,
            success,
            response_time_ms: self.response_time_ms,
            error_message: self.error_message,
            created_at,
        })
    }
}

/// Request-log rollup row.
#[derive(FromRow)]
pub struct DbRequestStatsRow {
    pub total: i64,
    pub successes: i64,
    pub failures: i64,
    pub avg_response_ms: Option<f64>,
}

impl DbRequestStatsRow {
    pub fn into_domain(self) -> RequestStats {
        RequestStats {
            total: self.total,
            successes: self.successes,
            failures: self.failures,
            avg_response_ms: self.avg_response_ms,
        }
    }
}

/// Conversion-log row from database.
#[derive(FromRow)]
pub struct DbConversionRow {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
    pub result: f64,
    pub rate: f64,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbConversionRow {
    /// Convert database row to domain ConversionLogEntry.
    pub fn into_domain(self) -> Result<ConversionLogEntry, RepoError> {
        let from_currency = parse_code(&self.from_currency)?;
        let to_currency = parse_code(&self.to_currency)?;

        #[cfg(not(feature = "sqlite"))]
        let created_at = self.created_at;

        #[cfg(feature = "sqlite")]
        let created_at = parse_timestamp(&self.created_at)?;

        Ok(ConversionLogEntry {
            id: self.id,
            from_currency,
            to_currency,
            amount: self.amount,
            result: self.result,
            rate: self.rate,
            created_at,
        })
    }
}

/// Pair-frequency row from the conversion log.
#[derive(FromRow)]
pub struct DbPopularPairRow {
    pub from_currency: String,
    pub to_currency: String,
    pub conversions: i64,
}

impl DbPopularPairRow {
    /// Convert database row to domain PopularPair.
    pub fn into_domain(self) -> Result<PopularPair, RepoError> {
        Ok(PopularPair {
            from_currency: parse_code(&self.from_currency)?,
            to_currency: parse_code(&self.to_currency)?,
            conversions: self.conversions,
        })
    }
}

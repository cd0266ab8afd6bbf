//! Rate domain models: provider snapshots, stored rates, freshness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::currency::{CurrencyCode, CurrencyPair};
use super::integration::IntegrationId;
use crate::error::DomainError;

/// Warning attached to conversion results older than one hour.
pub const STALE_DATA_WARNING: &str =
    "Exchange rate data may be outdated. Please check if integrations are active.";

/// The normalized output of one provider fetch. Ephemeral - the scheduler
/// fans it out into latest/history rows and never persists it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    /// The base currency the rates are quoted against
    pub base: CurrencyCode,
    /// Target currency -> units of target per one unit of base
    pub rates: BTreeMap<CurrencyCode, f64>,
    /// Provider-reported fetch time, or wall clock when unavailable
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Builds a snapshot, enforcing its invariants.
    ///
    /// # Validation
    /// - Every rate is a positive finite number
    /// - The base currency never appears as a target
    pub fn new(
        base: CurrencyCode,
        rates: BTreeMap<CurrencyCode, f64>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        for (target, rate) in &rates {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(DomainError::Validation(format!(
                    "Invalid rate for {target}: {rate}"
                )));
            }
        }
        if rates.contains_key(&base) {
            return Err(DomainError::Validation(format!(
                "Snapshot for {base} must not quote the base as a target"
            )));
        }
        Ok(Self {
            base,
            rates,
            fetched_at,
        })
    }
}

/// The most recent stored rate for one ordered currency pair.
///
/// Exactly one row exists per pair; whichever integration fetched last wins.
/// Serializable because the cache stores it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRate {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    pub source_integration_id: Option<IntegrationId>,
}

impl LatestRate {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.base.clone(), self.target.clone())
    }
}

/// One append-only history row per fetch per pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateHistoryEntry {
    pub id: i64,
    #[schema(value_type = String, example = "USD")]
    pub base: CurrencyCode,
    #[schema(value_type = String, example = "EUR")]
    pub target: CurrencyCode,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    pub source_integration_id: Option<IntegrationId>,
}

/// How old the data behind a conversion result is.
///
/// Purely informational: it never blocks or alters the numeric result.
#[derive(Debug, Clone, PartialEq)]
pub struct Freshness {
    /// Whole minutes elapsed since the data timestamp
    pub age_minutes: i64,
    /// Human-readable age ("just now", "5 minutes ago", "2 hours ago")
    pub age_label: String,
    /// Set when the data is more than an hour old
    pub stale: bool,
    /// Advisory message accompanying stale data
    pub warning: Option<String>,
}

impl Freshness {
    /// Computes freshness of `data_time` as seen from `now`.
    pub fn compute(data_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age_minutes = (now - data_time).num_minutes();

        let age_label = if age_minutes < 1 {
            "just now".to_string()
        } else if age_minutes < 60 {
            let unit = if age_minutes > 1 { "minutes" } else { "minute" };
            format!("{age_minutes} {unit} ago")
        } else {
            let age_hours = age_minutes / 60;
            let unit = if age_hours > 1 { "hours" } else { "hour" };
            format!("{age_hours} {unit} ago")
        };

        let stale = age_minutes > 60;
        let warning = stale.then(|| STALE_DATA_WARNING.to_string());

        Self {
            age_minutes,
            age_label,
            stale,
            warning,
        }
    }
}

/// Validates a conversion amount: positive and finite.
pub fn validate_amount(amount: f64) -> Result<(), DomainError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }
    Ok(())
}

//! Domain models for the exchange rate hub.

pub mod currency;
pub mod integration;
pub mod rate;
pub mod telemetry;

pub use currency::{BaseCurrencies, CurrencyCode, CurrencyPair, anchor_currencies};
pub use integration::{Integration, IntegrationId, IntegrationUpdate, NewIntegration, ProviderKind};
pub use rate::{Freshness, LatestRate, RateHistoryEntry, RateSnapshot, validate_amount};
pub use telemetry::{
    AggregatedUsage, ConversionLogEntry, PopularPair, RequestLogEntry, RequestStats, UsageRecord,
};

//! # RateHub Types
//!
//! Domain types and port traits for the exchange rate hub.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (currencies, integrations, rates, telemetry)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AggregatedUsage, BaseCurrencies, ConversionLogEntry, CurrencyCode, CurrencyPair, Freshness,
    Integration, IntegrationId, IntegrationUpdate, LatestRate, NewIntegration, PopularPair,
    ProviderKind, RateHistoryEntry, RateSnapshot, RequestLogEntry, RequestStats, UsageRecord,
    anchor_currencies,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{
    HistoryQuery, IntegrationFilter, ProviderError, RateCache, RateFilter, RateProvider,
    RateRepository, UsageMetrics,
};

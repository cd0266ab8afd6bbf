//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod cache;
mod provider;
mod repository;

pub use cache::{DEFAULT_RATE_TTL_SECONDS, RateCache};
pub use provider::{ProviderError, RateProvider, UsageMetrics};
pub use repository::{HistoryQuery, IntegrationFilter, RateFilter, RateRepository};

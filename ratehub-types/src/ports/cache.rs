//! Rate cache port.
//!
//! The cache is a best-effort accelerator in front of the repository.
//! Every operation is infallible at this boundary: a backend failure is
//! logged by the adapter and degrades to a miss (`get`) or a no-op
//! (`set`/`invalidate`), never an error the caller must handle.

use std::time::Duration;

use crate::domain::{CurrencyPair, LatestRate};

/// Default time-to-live for cached rates, in seconds.
pub const DEFAULT_RATE_TTL_SECONDS: u64 = 3600;

/// Port trait for the latest-rate cache.
#[async_trait::async_trait]
pub trait RateCache: Send + Sync + 'static {
    /// Looks up the cached rate for a pair. A backend failure is a miss.
    async fn get(&self, pair: &CurrencyPair) -> Option<LatestRate>;

    /// Caches a rate under its pair key for `ttl`.
    async fn set(&self, rate: &LatestRate, ttl: Duration);

    /// Drops one pair from the cache.
    async fn invalidate(&self, pair: &CurrencyPair);

    /// Drops every cached rate.
    async fn invalidate_all(&self);
}

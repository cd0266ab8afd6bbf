//! Cache adapters for the `RateCache` port.
//!
//! Redis when configured and reachable, an in-process LRU otherwise. Both
//! degrade instead of failing: the conversion path must keep answering from
//! the repository when the cache is gone.

mod memory;
mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Key prefix for cached rates. Shared so `invalidate_all` can match every
/// entry this service ever wrote.
pub(crate) const KEY_PREFIX: &str = "rates:";

pub(crate) fn cache_key(pair: &ratehub_types::CurrencyPair) -> String {
    format!("{KEY_PREFIX}{}", pair.key())
}

//! In-process LRU cache fallback.
//!
//! Used when no external cache backend is configured or reachable. Entries
//! carry a deadline and expire lazily on read; when full, the least recently
//! touched entry is evicted (a linear scan, fine at this capacity).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ratehub_types::{CurrencyPair, LatestRate, RateCache};

use super::cache_key;

/// Default entry capacity of the fallback cache.
pub const DEFAULT_CAPACITY: usize = 1000;

struct Entry {
    rate: LatestRate,
    expires_at: Instant,
    touched: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    clock: u64,
}

/// Capacity-bounded in-memory rate cache.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl RateCache for MemoryCache {
    async fn get(&self, pair: &CurrencyPair) -> Option<LatestRate> {
        let key = cache_key(pair);
        let mut inner = self.inner.lock().await;

        let expired = inner
            .entries
            .get(&key)
            .is_some_and(|entry| Instant::now() >= entry.expires_at);
        if expired {
            inner.entries.remove(&key);
            return None;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(&key)?;
        entry.touched = clock;
        Some(entry.rate.clone())
    }

    async fn set(&self, rate: &LatestRate, ttl: Duration) {
        let key = cache_key(&rate.pair());
        let mut inner = self.inner.lock().await;

        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        inner.clock += 1;
        let touched = inner.clock;
        inner.entries.insert(
            key,
            Entry {
                rate: rate.clone(),
                expires_at: Instant::now() + ttl,
                touched,
            },
        );
    }

    async fn invalidate(&self, pair: &CurrencyPair) {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(&cache_key(pair));
    }

    async fn invalidate_all(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratehub_types::CurrencyCode;

    fn rate(base: &str, target: &str, value: f64) -> LatestRate {
        LatestRate {
            base: CurrencyCode::parse(base).unwrap(),
            target: CurrencyCode::parse(target).unwrap(),
            rate: value,
            fetched_at: Utc::now(),
            source_integration_id: None,
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::default();
        let usd_eur = rate("USD", "EUR", 0.92);
        cache.set(&usd_eur, Duration::from_secs(60)).await;

        let hit = cache.get(&usd_eur.pair()).await.unwrap();
        assert_eq!(hit, usd_eur);

        let miss = rate("USD", "GBP", 0.79);
        assert!(cache.get(&miss.pair()).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::default();
        let usd_eur = rate("USD", "EUR", 0.92);
        cache.set(&usd_eur, Duration::ZERO).await;

        assert!(cache.get(&usd_eur.pair()).await.is_none());
    }

    #[tokio::test]
    async fn test_eviction_drops_least_recently_touched() {
        let cache = MemoryCache::new(2);
        let a = rate("USD", "EUR", 0.92);
        let b = rate("USD", "GBP", 0.79);
        let c = rate("USD", "JPY", 148.0);

        cache.set(&a, Duration::from_secs(60)).await;
        cache.set(&b, Duration::from_secs(60)).await;

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(cache.get(&a.pair()).await.is_some());

        cache.set(&c, Duration::from_secs(60)).await;
        assert!(cache.get(&a.pair()).await.is_some());
        assert!(cache.get(&b.pair()).await.is_none());
        assert!(cache.get(&c.pair()).await.is_some());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let cache = MemoryCache::new(2);
        let a = rate("USD", "EUR", 0.92);
        let b = rate("USD", "GBP", 0.79);

        cache.set(&a, Duration::from_secs(60)).await;
        cache.set(&b, Duration::from_secs(60)).await;

        let a_updated = rate("USD", "EUR", 0.93);
        cache.set(&a_updated, Duration::from_secs(60)).await;

        assert_eq!(cache.get(&a.pair()).await.unwrap().rate, 0.93);
        assert!(cache.get(&b.pair()).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MemoryCache::default();
        let a = rate("USD", "EUR", 0.92);
        let b = rate("USD", "GBP", 0.79);
        cache.set(&a, Duration::from_secs(60)).await;
        cache.set(&b, Duration::from_secs(60)).await;

        cache.invalidate(&a.pair()).await;
        assert!(cache.get(&a.pair()).await.is_none());
        assert!(cache.get(&b.pair()).await.is_some());

        cache.invalidate_all().await;
        assert!(cache.get(&b.pair()).await.is_none());
    }
}

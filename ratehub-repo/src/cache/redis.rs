//! Redis cache adapter.
//!
//! Backend failures never propagate: a read error is a miss, a write or
//! invalidation error is a no-op, each logged at warn level.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

use ratehub_types::{CurrencyPair, LatestRate, RateCache};

use super::{KEY_PREFIX, cache_key};

/// Redis-backed rate cache over one multiplexed connection.
///
/// The connection is cloned per command; clones share the underlying
/// socket, so this stays a single TCP connection.
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connects and verifies the server responds to PING.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RateCache for RedisCache {
    async fn get(&self, pair: &CurrencyPair) -> Option<LatestRate> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = match conn.get(cache_key(pair)).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(pair = %pair, error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(payload.as_deref()?) {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::warn!(pair = %pair, error = %e, "dropping undecodable cache entry");
                None
            }
        }
    }

    async fn set(&self, rate: &LatestRate, ttl: Duration) {
        let key = cache_key(&rate.pair());
        let payload = match serde_json::to_string(rate) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode rate for cache");
                return;
            }
        };

        let mut conn = self.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(&key, payload, ttl.as_secs()).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    async fn invalidate(&self, pair: &CurrencyPair) {
        let key = cache_key(pair);
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(&key).await {
            tracing::warn!(key, error = %e, "cache delete failed");
        }
    }

    async fn invalidate_all(&self) {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = match conn.keys(format!("{KEY_PREFIX}*")).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "cache key scan failed");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::warn!(error = %e, "cache clear failed");
        }
    }
}

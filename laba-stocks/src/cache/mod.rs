//! Cache store adapter.
//!
//! A key-value store with per-entry TTL. The orchestrator only needs `get` and
//! `set`; `delete` and `clear` exist for maintenance. No business logic lives
//! here: payloads are opaque bytes.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use memory::{CacheStats, MemoryCacheStore};
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisCacheStore;

use async_trait::async_trait;
use laba_common::config::{CacheBackend, CacheConfig};
use std::sync::Arc;

/// Errors raised by a cache backend.
///
/// The orchestrator downgrades all of these: a failed read is a miss and a
/// failed write is logged.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache command failed: {0}")]
    Command(String),
}

/// Key-value store with TTL.
///
/// Implementations must make each `get`/`set` atomic per key; nothing else is
/// assumed about concurrency.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logging ("memory", "redis").
    fn name(&self) -> &'static str;

    /// Fetch a live entry, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError>;

    /// Remove a single entry.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Build the configured cache store.
///
/// Falls back to the in-memory store when Redis support is compiled out.
pub async fn create_store(config: &CacheConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackend::Redis => {
            #[cfg(feature = "redis-backend")]
            {
                let store = RedisCacheStore::connect(&config.redis_url).await?;
                tracing::info!(url = %config.redis_url, "Connected to Redis cache");
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis-backend"))]
            {
                tracing::warn!(
                    "Redis cache requested but the redis-backend feature is disabled. \
                     Falling back to in-memory cache."
                );
                Ok(Arc::new(MemoryCacheStore::new()))
            }
        }
    }
}

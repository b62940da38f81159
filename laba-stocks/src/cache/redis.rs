//! Redis-backed cache store (`SETEX` / `GET`).

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{CacheError, CacheStore};

/// Cache store backed by a shared Redis instance.
///
/// The connection manager reconnects on its own; cloning it per command is
/// cheap and keeps `&self` methods lock-free.
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    /// Open a managed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs.max(1))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }
}

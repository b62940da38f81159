//! In-memory cache store with per-entry TTL.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CacheError, CacheStore};

/// Longest TTL honoured; larger values are capped (about 100 years).
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Vec<u8>,
    written_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(payload: Vec<u8>, ttl_secs: u64) -> Self {
        Self {
            payload,
            written_at: Utc::now(),
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(MAX_TTL_SECS)),
        }
    }

    fn is_expired(&self) -> bool {
        self.written_at
            .checked_add_signed(self.ttl)
            .is_some_and(|expires_at| Utc::now() >= expires_at)
    }
}

/// Process-local cache store.
///
/// Expired entries are hidden on read and pruned on every write, so the map
/// only holds live keys plus whatever expired since the last `set`.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all expired entries
    pub fn clear_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let (total, expired) = self
            .entries
            .read()
            .map(|e| (e.len(), e.values().filter(|v| v.is_expired()).count()))
            .unwrap_or((0, 0));

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("memory cache lock poisoned".into())
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;

        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.payload.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value.to_vec(), ttl_secs);
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.retain(|_, e| !e.is_expired());
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.clear();
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

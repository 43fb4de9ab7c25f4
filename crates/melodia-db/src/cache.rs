//! Key-value cache with per-entry expiry.
//!
//! The cache is never a source of truth: callers are expected to treat any
//! [`CacheError`] as a miss and fall back to the database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache command error: {0}")]
    Command(String),
}

/// Operations every cache backend must implement.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

// ─── In-process backend ────────────────────────────────────────────

/// Entry bound for [`MemoryCache::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local cache, used when no Redis instance is configured.
///
/// Holds at most `max_entries` keys. Inserting a new key into a full map
/// first drops every expired entry, then the entries closest to expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
    max_entries: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Make room for one more key.
fn evict_if_needed(
    entries: &mut HashMap<String, (String, Instant)>,
    max_entries: usize,
    now: Instant,
) {
    if entries.len() < max_entries {
        return;
    }

    let before = entries.len();
    entries.retain(|_, (_, expires_at)| *expires_at > now);
    let expired = before - entries.len();

    let mut evicted = 0;
    if entries.len() >= max_entries {
        let mut by_expiry: Vec<(String, Instant)> = entries
            .iter()
            .map(|(key, (_, expires_at))| (key.clone(), *expires_at))
            .collect();
        by_expiry.sort_by_key(|(_, expires_at)| *expires_at);

        let excess = entries.len() + 1 - max_entries;
        for (key, _) in by_expiry.into_iter().take(excess) {
            entries.remove(&key);
            evicted += 1;
        }
    }

    tracing::debug!(expired, evicted, remaining = entries.len(), "memory cache swept");
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > now => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if matches!(entries.get(key), Some((_, expires_at)) if *expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            evict_if_needed(&mut entries, self.max_entries, now);
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

// ─── Redis backend ─────────────────────────────────────────────────

#[cfg(feature = "redis")]
pub struct RedisCache {
    pool: deadpool_redis::Pool,
}

#[cfg(feature = "redis")]
impl RedisCache {
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let pool = deadpool_redis::Config::from_url(url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(format!("cannot create redis pool: {e}")))?;
        Ok(Self { pool })
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        use deadpool_redis::redis::AsyncCommands;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CacheError::Command(format!("GET {key}: {e}")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        use deadpool_redis::redis::AsyncCommands;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Command(format!("SETEX {key}: {e}")))
    }
}

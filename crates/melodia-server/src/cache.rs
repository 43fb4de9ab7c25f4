//! Read-through response cache for the public read paths.

use melodia_db::CacheStore;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::auth::Role;

/// Lifetime of every cached response.
pub const RESPONSE_TTL: Duration = Duration::from_secs(300);

/// Whether a request may read and write the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    CacheAware,
    /// Always hits the store and leaves the cache untouched.
    CacheBypassing,
}

impl CachePolicy {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => CachePolicy::CacheBypassing,
            Role::User | Role::Anonymous => CachePolicy::CacheAware,
        }
    }
}

/// A [`CacheStore`] viewed through one request's [`CachePolicy`].
///
/// Backend failures and undecodable entries are logged and behave like
/// misses, so an unavailable cache only costs store round-trips.
pub struct ResponseCache<'a> {
    store: &'a dyn CacheStore,
    policy: CachePolicy,
}

impl<'a> ResponseCache<'a> {
    pub fn new(store: &'a dyn CacheStore, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        if self.policy == CachePolicy::CacheBypassing {
            return None;
        }
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, "discarding undecodable cache entry: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, "cache read failed, falling back to store: {e}");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: &Value) {
        if self.policy == CachePolicy::CacheBypassing {
            return;
        }
        if let Err(e) = self.store.set(key, &value.to_string(), RESPONSE_TTL).await {
            tracing::warn!(key, "cache write skipped: {e}");
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    /// Errors from `fetch` are returned as-is and never cached.
    pub async fn read_through<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        self.put(key, &value).await;
        Ok(value)
    }
}

//! Cache-aside core shared by the cached repositories.
//!
//! Per key the cache is either Absent or Populated. A read in Populated
//! returns the cached value; a read in Absent (or over a corrupt or
//! unreadable entry) goes to the store and repopulates. A write always goes
//! to the store first and then invalidates every key it could have made
//! stale. Cache faults never fail the caller: they are logged and absorbed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ordelo_core::{CacheError, Deadline, OrdeloConfig, OrdeloResult};
use serde::{de::DeserializeOwned, Serialize};

use super::key::CacheKey;
use super::traits::{CacheStats, KeyValueCache};

/// Configuration for the cache-aside layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for populated entries.
    pub entry_ttl: Duration,
    /// Bound on post-write invalidation, independent of the caller's deadline.
    pub invalidation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(300),
            invalidation_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the post-write invalidation bound.
    pub fn with_invalidation_timeout(mut self, timeout: Duration) -> Self {
        self.invalidation_timeout = timeout;
        self
    }
}

impl From<&OrdeloConfig> for CacheConfig {
    fn from(config: &OrdeloConfig) -> Self {
        Self::new()
            .with_ttl(config.cache_ttl)
            .with_invalidation_timeout(config.invalidation_timeout)
    }
}

async fn bounded<T, F>(deadline: Deadline, operation: &str, work: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    deadline
        .bound(work)
        .await
        .unwrap_or_else(|_| {
            Err(CacheError::Timeout {
                operation: operation.to_string(),
            })
        })
}

/// Read-through population and write-path invalidation over one cache.
pub struct CacheAside<K: KeyValueCache> {
    cache: Arc<K>,
    config: CacheConfig,
}

impl<K: KeyValueCache> Clone for CacheAside<K> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

impl<K: KeyValueCache> CacheAside<K> {
    pub fn new(cache: Arc<K>, config: CacheConfig) -> Self {
        Self { cache, config }
    }

    pub fn with_defaults(cache: Arc<K>) -> Self {
        Self::new(cache, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &K {
        &self.cache
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.cache.stats().await
    }

    /// Serve `key` from the cache, or run `fetch` and populate on success.
    ///
    /// Store errors from `fetch` propagate unchanged and leave the cache as
    /// it was.
    pub async fn read<T, F, Fut>(
        &self,
        deadline: Deadline,
        key: CacheKey,
        fetch: F,
    ) -> OrdeloResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = OrdeloResult<T>>,
    {
        if let Some(value) = self.lookup(deadline, &key).await {
            return Ok(value);
        }

        let value = fetch().await?;
        self.populate(deadline, &key, &value).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, deadline: Deadline, key: &CacheKey) -> Option<T> {
        let bytes = match bounded(deadline, "get", self.cache.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, using store");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                let error = CacheError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(key = %key, error = %error, "Corrupt cache entry, using store");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, deadline: Deadline, key: &CacheKey, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode value for cache");
                return;
            }
        };

        match bounded(
            deadline,
            "set",
            self.cache.set(key, &bytes, self.config.entry_ttl),
        )
        .await
        {
            Ok(()) => tracing::debug!(key = %key, bytes = bytes.len(), "Cache populated"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to populate cache"),
        }
    }

    /// Existence-check then delete `keys`. Returns how many were removed.
    pub async fn try_invalidate(
        &self,
        deadline: Deadline,
        keys: &[CacheKey],
    ) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Err(CacheError::EmptyKeySet);
        }

        let present = bounded(deadline, "exists", self.cache.exists(keys)).await?;
        if present == 0 {
            return Ok(0);
        }
        bounded(deadline, "delete", self.cache.delete(keys)).await
    }

    /// Invalidate `keys`, logging the outcome. Never fails.
    pub async fn invalidate(&self, deadline: Deadline, keys: &[CacheKey]) {
        match self.try_invalidate(deadline, keys).await {
            Ok(deleted) => {
                tracing::debug!(keys = keys.len(), deleted, "Cache keys invalidated")
            }
            Err(e) => tracing::warn!(
                keys = keys.len(),
                error = %e,
                "Cache invalidation failed, entries expire by TTL"
            ),
        }
    }

    /// Run a store write under `deadline`, then invalidate `keys` whatever
    /// its outcome.
    ///
    /// Invalidation is bounded by `invalidation_timeout` starting after the
    /// store call returns, so a write that used up the caller's deadline
    /// still clears the entries it made stale.
    pub async fn write<T, Fut>(
        &self,
        deadline: Deadline,
        keys: &[CacheKey],
        write: Fut,
    ) -> OrdeloResult<T>
    where
        Fut: Future<Output = OrdeloResult<T>>,
    {
        let result = write.await;
        let invalidation = Deadline::after(self.config.invalidation_timeout);
        self.invalidate(invalidation, keys).await;
        result
    }
}

//! LMDB-backed key-value cache.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! cache for root snapshots and container arrays.
//!
//! # Value Format
//!
//! `[expires_at: 8 bytes, i64 millis since epoch, LE][payload]`
//!
//! Expired entries read as misses and are deleted on that read, or in bulk
//! by [`LmdbCache::purge_expired`].
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get` and `exists`
//! - Write transactions for `set`, `delete` and expiry
//! - Statistics behind an `RwLock`

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use ordelo_core::{CacheError, OrdeloConfig};

use super::key::CacheKey;
use super::traits::{CacheStats, KeyValueCache};

const HEADER_LEN: usize = 8;

/// Error type for opening an LMDB cache.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Backend {
            operation: "open".to_string(),
            reason: e.to_string(),
        }
    }
}

fn backend(operation: &str, e: heed::Error) -> CacheError {
    CacheError::Backend {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Expiry instant of a stored value, `None` when the header is truncated.
fn expires_at(bytes: &[u8]) -> Option<i64> {
    let header: [u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
    Some(i64::from_le_bytes(header))
}

/// LMDB-backed [`KeyValueCache`].
///
/// # Example
///
/// ```ignore
/// use ordelo_storage::cache::{CacheKey, KeyValueCache, LmdbCache};
///
/// let cache = LmdbCache::new("/tmp/ordelo-cache", 64)?;
/// let key = CacheKey::root(RootKind::User, user_id);
/// cache.set(&key, &bytes, Duration::from_secs(300)).await?;
/// ```
pub struct LmdbCache {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Global statistics.
    stats: Arc<RwLock<CacheStats>>,
}

impl LmdbCache {
    /// Open (creating if needed) an LMDB cache at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let (entry_count, memory_bytes) = {
            let rtxn = env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            let iter = db
                .iter(&rtxn)
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            let mut count = 0u64;
            let mut bytes = 0u64;
            for (_, value) in iter.flatten() {
                count += 1;
                bytes += value.len() as u64;
            }
            (count, bytes)
        };

        tracing::info!(
            path = %path.as_ref().display(),
            max_size_mb,
            entry_count,
            memory_bytes,
            "LMDB cache opened"
        );

        Ok(Self {
            env,
            db,
            stats: Arc::new(RwLock::new(CacheStats {
                entry_count,
                memory_bytes,
                ..Default::default()
            })),
        })
    }

    /// Open the cache at the configured path and size.
    pub fn from_config(config: &OrdeloConfig) -> Result<Self, LmdbCacheError> {
        Self::new(&config.cache_path, config.cache_max_size_mb)
    }

    fn with_stats(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    fn read_raw(&self, encoded: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        let rtxn = self.env.read_txn().map_err(|e| backend("get", e))?;
        let bytes = self
            .db
            .get(&rtxn, encoded)
            .map_err(|e| backend("get", e))?;
        Ok(bytes.map(<[u8]>::to_vec))
    }

    fn remove(&self, operation: &str, keys: &[Vec<u8>]) -> Result<u64, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(|e| backend(operation, e))?;
        let mut deleted = 0u64;
        let mut freed = 0u64;
        for key in keys {
            let size = self
                .db
                .get(&wtxn, key)
                .map_err(|e| backend(operation, e))?
                .map(|bytes| bytes.len() as u64);
            let Some(size) = size else {
                continue;
            };
            if self
                .db
                .delete(&mut wtxn, key)
                .map_err(|e| backend(operation, e))?
            {
                deleted += 1;
                freed += size;
            }
        }
        wtxn.commit().map_err(|e| backend(operation, e))?;

        self.with_stats(|stats| {
            stats.entry_count = stats.entry_count.saturating_sub(deleted);
            stats.memory_bytes = stats.memory_bytes.saturating_sub(freed);
        });
        Ok(deleted)
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = now_millis();
        let expired = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| backend("purge_expired", e))?;
            let iter = self
                .db
                .iter(&rtxn)
                .map_err(|e| backend("purge_expired", e))?;

            let mut expired = Vec::new();
            for result in iter {
                match result {
                    Ok((key, value)) => {
                        if expires_at(value).map_or(true, |at| at <= now) {
                            expired.push(key.to_vec());
                        }
                    }
                    Err(_) => continue,
                }
            }
            expired
        };

        let deleted = self.remove("purge_expired", &expired)?;
        self.with_stats(|stats| stats.expirations += deleted);
        tracing::debug!(deleted, "Expired cache entries purged");
        Ok(deleted)
    }
}

#[async_trait]
impl KeyValueCache for LmdbCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let encoded = key.encode();
        let Some(bytes) = self.read_raw(&encoded)? else {
            self.with_stats(|stats| stats.misses += 1);
            return Ok(None);
        };

        let Some(expires) = expires_at(&bytes) else {
            self.with_stats(|stats| stats.misses += 1);
            return Err(CacheError::Corrupt {
                key: key.to_string(),
                reason: "entry shorter than its expiry header".to_string(),
            });
        };

        if expires <= now_millis() {
            self.with_stats(|stats| {
                stats.misses += 1;
                stats.expirations += 1;
            });
            self.remove("get", &[encoded])?;
            return Ok(None);
        }

        self.with_stats(|stats| stats.hits += 1);
        Ok(Some(bytes[HEADER_LEN..].to_vec()))
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let encoded = key.encode();
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires = now_millis().saturating_add(ttl_millis);

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + value.len());
        full_bytes.extend_from_slice(&expires.to_le_bytes());
        full_bytes.extend_from_slice(value);

        let mut wtxn = self.env.write_txn().map_err(|e| backend("set", e))?;
        // Size of the entry being replaced, read under the same write lock.
        let previous = self
            .db
            .get(&wtxn, &encoded)
            .map_err(|e| backend("set", e))?
            .map(|bytes| bytes.len() as u64);
        self.db
            .put(&mut wtxn, &encoded, &full_bytes)
            .map_err(|e| backend("set", e))?;
        wtxn.commit().map_err(|e| backend("set", e))?;

        self.with_stats(|stats| {
            match previous {
                Some(size) => stats.memory_bytes = stats.memory_bytes.saturating_sub(size),
                None => stats.entry_count += 1,
            }
            stats.memory_bytes += full_bytes.len() as u64;
        });
        Ok(())
    }

    async fn exists(&self, keys: &[CacheKey]) -> Result<u64, CacheError> {
        let now = now_millis();
        let rtxn = self.env.read_txn().map_err(|e| backend("exists", e))?;
        let mut present = 0u64;
        for key in keys {
            let live = self
                .db
                .get(&rtxn, &key.encode())
                .map_err(|e| backend("exists", e))?
                .and_then(expires_at)
                .is_some_and(|at| at > now);
            if live {
                present += 1;
            }
        }
        Ok(present)
    }

    async fn delete(&self, keys: &[CacheKey]) -> Result<u64, CacheError> {
        let encoded: Vec<Vec<u8>> = keys.iter().map(CacheKey::encode).collect();
        self.remove("delete", &encoded)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.stats.read().map(|s| s.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordelo_core::{ContainerKind, EntityId, RootKind};
    use tempfile::TempDir;

    fn create_test_cache() -> (LmdbCache, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let cache = LmdbCache::new(temp_dir.path(), 10).expect("cache creation should succeed");
        (cache, temp_dir)
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_and_get() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::root(RootKind::User, EntityId::now_v7());

        cache
            .set(&key, b"{\"name\":\"Ada\"}", TTL)
            .await
            .expect("set should succeed");
        let cached = cache.get(&key).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some(&b"{\"name\":\"Ada\"}"[..]));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::root(RootKind::Vendor, EntityId::now_v7());
        assert!(cache.get(&key).await.expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::containers(ContainerKind::Cart, EntityId::now_v7());

        cache
            .set(&key, b"[]", Duration::ZERO)
            .await
            .expect("set should succeed");
        assert!(cache.get(&key).await.expect("get should succeed").is_none());
        assert_eq!(cache.exists(&[key]).await.expect("exists should succeed"), 0);

        let stats = cache.stats().await.expect("stats should succeed");
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (cache, _temp_dir) = create_test_cache();
        let id = EntityId::now_v7();
        let keys = CacheKey::all_for_root(RootKind::User, id);

        cache
            .set(&keys[0], b"{}", TTL)
            .await
            .expect("set should succeed");
        cache
            .set(&keys[1], b"[]", TTL)
            .await
            .expect("set should succeed");

        assert_eq!(cache.exists(&keys).await.expect("exists should succeed"), 2);
        assert_eq!(cache.delete(&keys).await.expect("delete should succeed"), 2);
        assert_eq!(cache.exists(&keys).await.expect("exists should succeed"), 0);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_entries() {
        let (cache, _temp_dir) = create_test_cache();
        let live = CacheKey::root(RootKind::Admin, EntityId::now_v7());
        let stale = CacheKey::root(RootKind::Admin, EntityId::now_v7());

        cache.set(&live, b"{}", TTL).await.expect("set should succeed");
        cache
            .set(&stale, b"{}", Duration::ZERO)
            .await
            .expect("set should succeed");

        assert_eq!(cache.purge_expired().expect("purge should succeed"), 1);
        assert!(cache.get(&live).await.expect("get should succeed").is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::root(RootKind::User, EntityId::now_v7());

        let _ = cache.get(&key).await;
        cache.set(&key, b"{}", TTL).await.expect("set should succeed");
        let _ = cache.get(&key).await;
        let _ = cache.get(&key).await;

        let stats = cache.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::root(RootKind::User, EntityId::now_v7());

        cache.set(&key, b"old", TTL).await.expect("set should succeed");
        cache.set(&key, b"new", TTL).await.expect("set should succeed");

        let cached = cache.get(&key).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some(&b"new"[..]));
        assert_eq!(
            cache.stats().await.expect("stats should succeed").entry_count,
            1
        );
    }

    #[tokio::test]
    async fn test_memory_bytes_tracks_live_entries() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::root(RootKind::User, EntityId::now_v7());
        let other = CacheKey::root(RootKind::User, EntityId::now_v7());
        fn entry_size(value: &[u8]) -> u64 {
            (HEADER_LEN + value.len()) as u64
        }

        cache.set(&key, b"old", TTL).await.expect("set should succeed");
        cache.set(&key, b"newer", TTL).await.expect("set should succeed");
        cache.set(&other, b"{}", TTL).await.expect("set should succeed");
        let stats = cache.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.memory_bytes, entry_size(b"newer") + entry_size(b"{}"));

        cache.delete(&[key]).await.expect("delete should succeed");
        let stats = cache.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, entry_size(b"{}"));

        cache.delete(&[other]).await.expect("delete should succeed");
        assert_eq!(
            cache.stats().await.expect("stats should succeed").memory_bytes,
            0
        );
    }

    #[tokio::test]
    async fn test_reopen_counts_existing_entries() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let cache = LmdbCache::new(temp_dir.path(), 10).expect("cache creation should succeed");
            let key = CacheKey::root(RootKind::User, EntityId::now_v7());
            cache.set(&key, b"{}", TTL).await.expect("set should succeed");
        }
        let reopened = LmdbCache::new(temp_dir.path(), 10).expect("cache creation should succeed");
        let stats = reopened.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, (HEADER_LEN + 2) as u64);
    }
}

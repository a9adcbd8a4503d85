//! Key-value cache boundary.

use std::time::Duration;

use async_trait::async_trait;
use ordelo_core::CacheError;

use super::key::CacheKey;

/// Byte-oriented key-value cache with per-entry expiry.
///
/// Implementations should be thread-safe and support concurrent access.
/// Deadlines are enforced by the caller.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Stored bytes, or `None` on a miss or an expired entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value`, replacing any previous entry, for `ttl`.
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Number of `keys` currently present.
    async fn exists(&self, keys: &[CacheKey]) -> Result<u64, CacheError>;

    /// Remove `keys`. Returns how many were present.
    async fn delete(&self, keys: &[CacheKey]) -> Result<u64, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
    /// Entries dropped because they expired.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}

//! Configuration types

use crate::{ConfigError, Deadline, OrdeloError, OrdeloResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Data layer configuration.
///
/// Connection pooling and process bootstrap live outside this crate; this
/// struct only carries the values the repositories and the cache need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdeloConfig {
    /// Database (namespace) holding the root collections.
    pub database_name: String,
    /// Time-to-live of cache-aside entries.
    pub cache_ttl: Duration,
    /// Directory of the LMDB cache environment.
    pub cache_path: PathBuf,
    /// LMDB map size in megabytes.
    pub cache_max_size_mb: usize,
    /// Deadline applied when a caller does not bring its own.
    pub operation_timeout: Duration,
    /// Bound on the invalidation that follows every write. Runs on its own
    /// clock once the store call has returned.
    pub invalidation_timeout: Duration,
}

impl Default for OrdeloConfig {
    fn default() -> Self {
        Self {
            database_name: "ordelo".to_string(),
            cache_ttl: Duration::from_secs(300),
            cache_path: PathBuf::from("./data/cache"),
            cache_max_size_mb: 64,
            operation_timeout: Duration::from_secs(5),
            invalidation_timeout: Duration::from_secs(2),
        }
    }
}

/// Read and parse `name`, warning when a value is present but unusable.
fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Unparsable value, using default");
            None
        }
    }
}

impl OrdeloConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_cache_max_size_mb(mut self, size: usize) -> Self {
        self.cache_max_size_mb = size;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_invalidation_timeout(mut self, timeout: Duration) -> Self {
        self.invalidation_timeout = timeout;
        self
    }

    /// Deadline for one call starting now, using `operation_timeout`.
    pub fn default_deadline(&self) -> Deadline {
        Deadline::after(self.operation_timeout)
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `ORDELO_DB_NAME`: Database name (default: ordelo)
    /// - `ORDELO_CACHE_TTL_SECS`: Cache entry TTL in seconds (default: 300)
    /// - `ORDELO_CACHE_PATH`: LMDB cache directory (default: ./data/cache)
    /// - `ORDELO_CACHE_MAX_SIZE_MB`: LMDB map size (default: 64)
    /// - `ORDELO_OPERATION_TIMEOUT_MS`: Default per-call timeout (default: 5000)
    /// - `ORDELO_INVALIDATION_TIMEOUT_MS`: Post-write invalidation bound (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_name: std::env::var("ORDELO_DB_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.database_name),
            cache_ttl: parse_env("ORDELO_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            cache_path: std::env::var("ORDELO_CACHE_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_max_size_mb: parse_env("ORDELO_CACHE_MAX_SIZE_MB")
                .unwrap_or(defaults.cache_max_size_mb),
            operation_timeout: parse_env("ORDELO_OPERATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.operation_timeout),
            invalidation_timeout: parse_env("ORDELO_INVALIDATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.invalidation_timeout),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OrdeloResult<()> {
        if self.database_name.trim().is_empty() {
            return Err(OrdeloError::Config(ConfigError::MissingRequired {
                field: "database_name".to_string(),
            }));
        }

        if self.cache_ttl.is_zero() {
            return Err(OrdeloError::Config(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: format!("{:?}", self.cache_ttl),
                reason: "cache_ttl must be positive".to_string(),
            }));
        }

        if self.cache_max_size_mb == 0 {
            return Err(OrdeloError::Config(ConfigError::InvalidValue {
                field: "cache_max_size_mb".to_string(),
                value: self.cache_max_size_mb.to_string(),
                reason: "cache_max_size_mb must be greater than 0".to_string(),
            }));
        }

        if self.operation_timeout.is_zero() {
            return Err(OrdeloError::Config(ConfigError::InvalidValue {
                field: "operation_timeout".to_string(),
                value: format!("{:?}", self.operation_timeout),
                reason: "operation_timeout must be positive".to_string(),
            }));
        }

        if self.invalidation_timeout.is_zero() {
            return Err(OrdeloError::Config(ConfigError::InvalidValue {
                field: "invalidation_timeout".to_string(),
                value: format!("{:?}", self.invalidation_timeout),
                reason: "invalidation_timeout must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

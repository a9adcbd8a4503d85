//! Cache layer for root snapshots and container arrays.
//!
//! The cache is keyed by primary identifier only: [`CacheKey`] names either
//! a root snapshot (`user:<id>`) or one of its container arrays
//! (`user:<id>:recipes`). [`CacheAside`] implements read-through population
//! and write-path invalidation on top of any [`KeyValueCache`], and the
//! decorators in [`crate::cached`] apply it to the root repositories.
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(LmdbCache::from_config(&config)?);
//! let aside = CacheAside::new(cache, CacheConfig::from(&config));
//! let users = CachedUserRepository::new(DocumentUserRepository::new(store), aside);
//!
//! // Served from the store, then from the cache until a write invalidates it
//! let recipes = users.find_recipes(config.default_deadline(), user_id).await?;
//! ```

pub mod aside;
pub mod key;
pub mod lmdb_backend;
pub mod traits;

pub use aside::{CacheAside, CacheConfig};
pub use key::CacheKey;
pub use lmdb_backend::{LmdbCache, LmdbCacheError};
pub use traits::{CacheStats, KeyValueCache};

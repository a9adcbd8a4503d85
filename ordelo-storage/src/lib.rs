//! Ordelo Storage - Container Mutation Engine and Cached Repositories
//!
//! Root aggregates are stored one document per root in a [`DocumentStore`].
//! The [`mutation`] module plans container create/update/delete as batched
//! array writes and verifies their outcome; [`repository`] exposes the root
//! repositories built on it; [`cache`] and [`cached`] layer cache-aside reads
//! and write-path invalidation on top.

pub mod cache;
pub mod cached;
pub mod document;
pub mod mutation;
pub mod repository;

// Re-export the document layer
pub use document::{
    ArrayPath, DocumentStore, ElementPath, Filter, InMemoryDocumentStore, Projection, Update,
    WriteModel, WriteResult,
};

pub use mutation::{plan_create, plan_delete, plan_delete_items, plan_update, Expect, MutationPlan};

pub use repository::{
    AdminRepository, AggregateStore, DocumentAdminRepository, DocumentUserRepository,
    DocumentVendorRepository, UserRepository, VendorRepository, PROFILE_FIELDS,
};

// Re-export cache types for wiring
pub use cache::{
    CacheAside, CacheConfig, CacheKey, CacheStats, KeyValueCache, LmdbCache, LmdbCacheError,
};
pub use cached::{CachedAdminRepository, CachedUserRepository, CachedVendorRepository};

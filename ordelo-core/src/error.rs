//! Error types for Ordelo operations

use crate::{EntityId, EntityType, RootKind};
use thiserror::Error;

/// Storage layer errors.
///
/// This is the closed taxonomy callers of the repositories see. Transport
/// failures from a store adapter arrive already classified as `Backend`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with key {key}")]
    NotFound { entity_type: EntityType, key: String },

    #[error("No effect on {entity_type:?} under root {root_id}: {reason}")]
    NoEffect {
        entity_type: EntityType,
        root_id: EntityId,
        reason: String,
    },

    #[error("Write concern failure: {operation} on {entity_type:?} was not acknowledged")]
    WriteConcernFailure {
        entity_type: EntityType,
        operation: String,
    },

    #[error("Unknown container kind '{name}' for {root:?}")]
    UnknownContainerKind { root: RootKind, name: String },

    #[error("Deadline exceeded during {operation}")]
    Timeout { operation: String },

    #[error("Backend failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Document codec error for {entity_type:?}: {reason}")]
    Codec {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// NotFound for an entity addressed by identifier.
    pub fn not_found(entity_type: EntityType, id: EntityId) -> Self {
        StorageError::NotFound {
            entity_type,
            key: id.to_string(),
        }
    }
}

/// Key-value cache errors.
///
/// The cache-aside wrapper absorbs all of these; they only surface when the
/// cache adapter is used directly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Corrupt cache entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache backend failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Deadline exceeded during cache {operation}")]
    Timeout { operation: String },

    #[error("Invalidation requested with an empty key set")]
    EmptyKeySet,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Ordelo errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrdeloError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Ordelo operations.
pub type OrdeloResult<T> = Result<T, OrdeloError>;

// =============================================================================
// TESTS
// =============================================================================

//! Document store boundary.

use async_trait::async_trait;
use ordelo_core::{RootKind, StorageError};
use serde_json::Value;

use super::{Filter, Projection, Update, WriteModel, WriteResult};

/// A store of one JSON document per root, one collection per root kind.
///
/// Implementations must apply each update atomically to the single document
/// it matches and must classify their own transport failures as
/// [`StorageError::Backend`]. Deadlines are enforced by the caller.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`, reduced by `projection` if given.
    async fn find_one(
        &self,
        collection: RootKind,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>, StorageError>;

    /// Every document matching `filter`.
    async fn find_many(
        &self,
        collection: RootKind,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Value>, StorageError>;

    /// Insert a document carrying its own `_id`.
    async fn insert_one(
        &self,
        collection: RootKind,
        document: Value,
    ) -> Result<WriteResult, StorageError>;

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: RootKind,
        filter: &Filter,
        update: &Update,
    ) -> Result<WriteResult, StorageError>;

    /// Apply `models` in order and report the summed counts.
    async fn bulk_write(
        &self,
        collection: RootKind,
        models: &[WriteModel],
    ) -> Result<WriteResult, StorageError>;

    async fn delete_one(
        &self,
        collection: RootKind,
        filter: &Filter,
    ) -> Result<WriteResult, StorageError>;

    async fn count(&self, collection: RootKind, filter: &Filter) -> Result<u64, StorageError>;
}

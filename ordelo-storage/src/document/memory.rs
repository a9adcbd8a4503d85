//! In-memory document store.
//!
//! Holds every collection behind one lock, so each update (and each bulk
//! write) is applied to its document atomically. Used by tests and by
//! embedders that do not need durability.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use ordelo_core::{
    ContainerKind, EntityId, FieldPatch, RootKind, StorageError, ID_FIELD, ITEMS_FIELD,
    ITEM_ID_FIELD,
};
use serde_json::Value;

use super::{
    ArrayPath, DocumentStore, ElementPath, Filter, Projection, Update, WriteModel, WriteResult,
};

type Collection = BTreeMap<EntityId, Value>;

/// In-memory [`DocumentStore`] keyed by root kind, then by `_id`.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    database: String,
    collections: Arc<RwLock<HashMap<RootKind, Collection>>>,
    acknowledge_writes: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new("ordelo")
    }
}

impl InMemoryDocumentStore {
    /// Create an empty store for `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Arc::new(RwLock::new(HashMap::new())),
            acknowledge_writes: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Report every following write as unacknowledged. The write itself is
    /// still applied, as with an unacknowledged write concern.
    pub fn set_acknowledge_writes(&self, acknowledge: bool) {
        self.acknowledge_writes.store(acknowledge, Ordering::SeqCst);
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Snapshot of one stored document.
    pub fn document(&self, collection: RootKind, id: EntityId) -> Option<Value> {
        self.collections
            .read()
            .ok()?
            .get(&collection)?
            .get(&id)
            .cloned()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: RootKind) -> usize {
        self.collections
            .read()
            .map(|c| c.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: RootKind) -> bool {
        self.len(collection) == 0
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut collections) = self.collections.write() {
            collections.clear();
        }
    }

    async fn simulate_latency(&self) {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn acknowledged(&self) -> bool {
        self.acknowledge_writes.load(Ordering::SeqCst)
    }

    fn apply_model(collection: &mut Collection, filter: &Filter, update: &Update) -> WriteResult {
        let mut result = WriteResult::acknowledged();
        if let Some(document) = collection.values_mut().find(|doc| matches(doc, filter)) {
            result.matched_count = 1;
            if apply(document, update) {
                result.modified_count = 1;
            }
        }
        result
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_one(
        &self,
        collection: RootKind,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>, StorageError> {
        self.simulate_latency().await;
        let collections = self.collections.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.values().find(|doc| matches(doc, filter)))
            .map(|doc| project(doc, projection)))
    }

    async fn find_many(
        &self,
        collection: RootKind,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Value>, StorageError> {
        self.simulate_latency().await;
        let collections = self.collections.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| matches(doc, filter))
                    .map(|doc| project(doc, projection))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: RootKind,
        document: Value,
    ) -> Result<WriteResult, StorageError> {
        self.simulate_latency().await;
        let id = document_id(&document).ok_or_else(|| StorageError::Backend {
            operation: "insert_one".to_string(),
            reason: "document has no valid _id".to_string(),
        })?;

        let mut collections = self.collections.write().map_err(|_| StorageError::LockPoisoned)?;
        let docs = collections.entry(collection).or_default();
        if docs.contains_key(&id) {
            return Err(StorageError::Backend {
                operation: "insert_one".to_string(),
                reason: format!("duplicate key {} in {}.{}", id, self.database, collection),
            });
        }
        docs.insert(id, document);

        Ok(WriteResult {
            acknowledged: self.acknowledged(),
            inserted_id: Some(id),
            ..Default::default()
        })
    }

    async fn update_one(
        &self,
        collection: RootKind,
        filter: &Filter,
        update: &Update,
    ) -> Result<WriteResult, StorageError> {
        self.simulate_latency().await;
        let mut collections = self.collections.write().map_err(|_| StorageError::LockPoisoned)?;
        let docs = collections.entry(collection).or_default();
        let mut result = Self::apply_model(docs, filter, update);
        tracing::trace!(
            collection = %collection,
            op = update.op_name(),
            kind = ?update.container_kind(),
            matched = result.matched_count,
            modified = result.modified_count,
            "Update applied"
        );
        result.acknowledged = self.acknowledged();
        Ok(result)
    }

    async fn bulk_write(
        &self,
        collection: RootKind,
        models: &[WriteModel],
    ) -> Result<WriteResult, StorageError> {
        self.simulate_latency().await;
        if models.is_empty() {
            return Err(StorageError::Backend {
                operation: "bulk_write".to_string(),
                reason: "bulk write requires at least one operation".to_string(),
            });
        }

        let mut collections = self.collections.write().map_err(|_| StorageError::LockPoisoned)?;
        let docs = collections.entry(collection).or_default();
        let mut total = WriteResult::acknowledged();
        for model in models {
            let result = Self::apply_model(docs, &model.filter, &model.update);
            tracing::trace!(
                collection = %collection,
                op = model.update.op_name(),
                kind = ?model.update.container_kind(),
                matched = result.matched_count,
                modified = result.modified_count,
                "Bulk write operation applied"
            );
            total.absorb(&result);
        }
        total.acknowledged = self.acknowledged();

        tracing::debug!(
            database = %self.database,
            collection = %collection,
            operations = models.len(),
            matched = total.matched_count,
            modified = total.modified_count,
            "Bulk write applied"
        );
        Ok(total)
    }

    async fn delete_one(
        &self,
        collection: RootKind,
        filter: &Filter,
    ) -> Result<WriteResult, StorageError> {
        self.simulate_latency().await;
        let mut collections = self.collections.write().map_err(|_| StorageError::LockPoisoned)?;
        let docs = collections.entry(collection).or_default();
        let target = docs
            .iter()
            .find(|(_, doc)| matches(doc, filter))
            .map(|(id, _)| *id);

        let mut result = WriteResult {
            acknowledged: self.acknowledged(),
            ..Default::default()
        };
        if let Some(id) = target {
            docs.remove(&id);
            result.deleted_count = 1;
        }
        Ok(result)
    }

    async fn count(&self, collection: RootKind, filter: &Filter) -> Result<u64, StorageError> {
        self.simulate_latency().await;
        let collections = self.collections.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.values().filter(|doc| matches(doc, filter)).count() as u64)
            .unwrap_or(0))
    }
}

// ============================================================================
// DOCUMENT WALKING
// ============================================================================

fn project(document: &Value, projection: Option<&Projection>) -> Value {
    match projection {
        Some(projection) => projection.apply(document),
        None => document.clone(),
    }
}

fn parse_id(value: Option<&Value>) -> Option<EntityId> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}

fn document_id(document: &Value) -> Option<EntityId> {
    parse_id(document.get(ID_FIELD))
}

fn has_id(element: &Value, id_field: &str, id: EntityId) -> bool {
    parse_id(element.get(id_field)) == Some(id)
}

fn matches(document: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Id(id) => document_id(document) == Some(*id),
        Filter::Field { field, value } => document.get(field) == Some(value),
        Filter::Element {
            root,
            kind,
            element,
        } => {
            document_id(document) == Some(*root)
                && document
                    .get(kind.array_field())
                    .and_then(Value::as_array)
                    .is_some_and(|array| array.iter().any(|e| has_id(e, kind.id_field(), *element)))
        }
    }
}

/// Array stored under `field`, created empty when absent or null.
fn array_field_mut<'a>(object: &'a mut Value, field: &str) -> Option<&'a mut Vec<Value>> {
    let slot = object
        .as_object_mut()?
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}

fn element_mut<'a>(array: &'a mut [Value], id_field: &str, id: EntityId) -> Option<&'a mut Value> {
    array.iter_mut().find(|element| has_id(element, id_field, id))
}

fn container_mut(
    document: &mut Value,
    kind: ContainerKind,
    container: EntityId,
) -> Option<&mut Value> {
    element_mut(array_field_mut(document, kind.array_field())?, kind.id_field(), container)
}

fn array_mut<'a>(document: &'a mut Value, path: &ArrayPath) -> Option<&'a mut Vec<Value>> {
    match path {
        ArrayPath::Containers(kind) => array_field_mut(document, kind.array_field()),
        ArrayPath::Items { kind, container } => {
            array_field_mut(container_mut(document, *kind, *container)?, ITEMS_FIELD)
        }
    }
}

fn set_fields(target: &mut Value, patch: &FieldPatch) -> bool {
    let Some(object) = target.as_object_mut() else {
        return false;
    };
    let mut changed = false;
    for (field, value) in patch.iter() {
        if object.get(field) != Some(value) {
            object.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Apply `update` to one document. Returns whether the document changed.
fn apply(document: &mut Value, update: &Update) -> bool {
    match update {
        Update::Set(patch) => set_fields(document, patch),
        Update::Push { path, values } => match array_mut(document, path) {
            Some(array) if !values.is_empty() => {
                array.extend(values.iter().cloned());
                true
            }
            _ => false,
        },
        Update::Patch { path, patch } => {
            let target = match path {
                ElementPath::Container { kind, container } => {
                    container_mut(document, *kind, *container)
                }
                ElementPath::Item {
                    kind,
                    container,
                    item,
                } => container_mut(document, *kind, *container)
                    .and_then(|c| array_field_mut(c, ITEMS_FIELD))
                    .and_then(|items| element_mut(items, ITEM_ID_FIELD, *item)),
            };
            target.is_some_and(|t| set_fields(t, patch))
        }
        Update::Pull { path, ids } => {
            let id_field = path.element_id_field();
            match array_mut(document, path) {
                Some(array) => {
                    let before = array.len();
                    array.retain(|element| !ids.iter().any(|id| has_id(element, id_field, *id)));
                    array.len() != before
                }
                None => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_doc(id: EntityId, recipe: EntityId, item: EntityId) -> Value {
        json!({
            "_id": id,
            "name": "Ada",
            "email": "ada@example.com",
            "saved_recipes": [
                {"_id": recipe, "title": "Dal", "serving_size": 2,
                 "items": [{"ingredient_id": item, "name": "lentils", "quantity": 1}]}
            ],
            "carts": [],
            "orders": []
        })
    }

    async fn seeded() -> (InMemoryDocumentStore, EntityId, EntityId, EntityId) {
        let store = InMemoryDocumentStore::new("ordelo_test");
        let (user, recipe, item) = (EntityId::now_v7(), EntityId::now_v7(), EntityId::now_v7());
        store
            .insert_one(RootKind::User, user_doc(user, recipe, item))
            .await
            .expect("insert should succeed");
        (store, user, recipe, item)
    }

    #[tokio::test]
    async fn test_insert_and_find_with_projection() {
        let (store, user, _, _) = seeded().await;
        let found = store
            .find_one(
                RootKind::User,
                &Filter::id(user),
                Some(&Projection::containers(ContainerKind::Cart)),
            )
            .await
            .expect("find should succeed")
            .expect("document should exist");
        assert_eq!(found, json!({"_id": user, "carts": []}));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_backend_error() {
        let (store, user, recipe, item) = seeded().await;
        let err = store
            .insert_one(RootKind::User, user_doc(user, recipe, item))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_patch_nested_item() {
        let (store, user, recipe, item) = seeded().await;
        let update = Update::Patch {
            path: ElementPath::Item {
                kind: ContainerKind::Recipe,
                container: recipe,
                item,
            },
            patch: FieldPatch::new().int("quantity", 4),
        };
        let result = store
            .update_one(RootKind::User, &Filter::id(user), &update)
            .await
            .expect("update should succeed");
        assert_eq!((result.matched_count, result.modified_count), (1, 1));

        let doc = store.document(RootKind::User, user).expect("document should exist");
        assert_eq!(doc["saved_recipes"][0]["items"][0]["quantity"], json!(4));
        assert_eq!(doc["saved_recipes"][0]["items"][0]["name"], json!("lentils"));
    }

    #[tokio::test]
    async fn test_same_value_set_is_not_a_modification() {
        let (store, user, _, _) = seeded().await;
        let result = store
            .update_one(
                RootKind::User,
                &Filter::id(user),
                &Update::Set(FieldPatch::new().text("name", "Ada")),
            )
            .await
            .expect("update should succeed");
        assert_eq!((result.matched_count, result.modified_count), (1, 0));
    }

    #[tokio::test]
    async fn test_element_filter_requires_container() {
        let (store, user, recipe, _) = seeded().await;
        let present = Filter::element(user, ContainerKind::Recipe, recipe);
        let absent = Filter::element(user, ContainerKind::Recipe, EntityId::now_v7());
        assert_eq!(store.count(RootKind::User, &present).await.expect("count"), 1);
        assert_eq!(store.count(RootKind::User, &absent).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_pull_items_and_containers() {
        let (store, user, recipe, item) = seeded().await;
        let models = vec![
            WriteModel::update_one(
                Filter::id(user),
                Update::Pull {
                    path: ArrayPath::Items {
                        kind: ContainerKind::Recipe,
                        container: recipe,
                    },
                    ids: vec![item],
                },
            ),
            WriteModel::update_one(
                Filter::id(user),
                Update::Pull {
                    path: ArrayPath::Containers(ContainerKind::Recipe),
                    ids: vec![recipe],
                },
            ),
        ];
        let result = store
            .bulk_write(RootKind::User, &models)
            .await
            .expect("bulk write should succeed");
        assert_eq!(result.modified_count, 2);

        let doc = store.document(RootKind::User, user).expect("document should exist");
        assert_eq!(doc["saved_recipes"], json!([]));
    }

    #[tokio::test]
    async fn test_unacknowledged_writes_still_apply() {
        let (store, user, _, _) = seeded().await;
        store.set_acknowledge_writes(false);
        let result = store
            .update_one(
                RootKind::User,
                &Filter::id(user),
                &Update::Set(FieldPatch::new().text("name", "Grace")),
            )
            .await
            .expect("update should succeed");
        assert!(!result.acknowledged);
        let doc = store.document(RootKind::User, user).expect("document should exist");
        assert_eq!(doc["name"], json!("Grace"));
    }

    #[tokio::test]
    async fn test_empty_bulk_write_rejected() {
        let store = InMemoryDocumentStore::default();
        assert!(store.bulk_write(RootKind::User, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_one_reports_count() {
        let (store, user, _, _) = seeded().await;
        let first = store
            .delete_one(RootKind::User, &Filter::id(user))
            .await
            .expect("delete should succeed");
        let second = store
            .delete_one(RootKind::User, &Filter::id(user))
            .await
            .expect("delete should succeed");
        assert_eq!(first.deleted_count, 1);
        assert_eq!(second.deleted_count, 0);
        assert!(store.is_empty(RootKind::User));
    }
}

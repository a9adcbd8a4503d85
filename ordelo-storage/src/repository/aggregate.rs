//! Root aggregate access over a [`DocumentStore`].
//!
//! `AggregateStore` holds the operations every root repository shares:
//! root CRUD, and container CRUD driven by the mutation engine. Each store
//! round-trip is bounded by the caller's deadline. Every container mutation
//! first checks that the root exists, so a missing root is always reported
//! as `NotFound` and never confused with `NoEffect`.

use std::future::Future;
use std::sync::Arc;

use ordelo_core::{
    Container, ContainerKind, Deadline, EntityId, EntityType, OrdeloResult, Profile, RootEntity,
    RootKind, StorageError, ValidationError,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::document::{DocumentStore, Filter, Projection, Update, WriteResult};
use crate::mutation::{plan_create, plan_delete, plan_delete_items, plan_update, MutationPlan};

/// Top-level profile fields returned by profile listings.
pub const PROFILE_FIELDS: &[&str] = &["name", "address", "email", "role"];

/// Shared root and container operations for one document store.
pub struct AggregateStore<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> Clone for AggregateStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> AggregateStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one store call under `deadline`.
    async fn bounded<T, F>(
        &self,
        deadline: Deadline,
        operation: &str,
        work: F,
    ) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match deadline.bound(work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(operation, error = %e, "Document store operation failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(operation, "Deadline exceeded");
                Err(StorageError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }

    async fn execute(
        &self,
        deadline: Deadline,
        collection: RootKind,
        plan: &MutationPlan,
    ) -> Result<WriteResult, StorageError> {
        let result = self
            .bounded(
                deadline,
                plan.operation(),
                self.store.bulk_write(collection, plan.models()),
            )
            .await?;
        plan.verify(&result)?;
        Ok(result)
    }

    /// `NotFound` unless the root exists.
    pub async fn ensure_root(
        &self,
        deadline: Deadline,
        kind: RootKind,
        id: EntityId,
    ) -> OrdeloResult<()> {
        let count = self
            .bounded(deadline, "count", self.store.count(kind, &Filter::id(id)))
            .await?;
        if count == 0 {
            return Err(StorageError::not_found(kind.entity_type(), id).into());
        }
        Ok(())
    }

    // ========================================================================
    // ROOTS
    // ========================================================================

    /// Persist a new root under a fresh identifier.
    ///
    /// Any containers and items supplied with the root get fresh identifiers
    /// too. The root's role is forced to match its kind.
    pub async fn create_root<R: RootEntity>(
        &self,
        deadline: Deadline,
        root: &mut R,
    ) -> OrdeloResult<EntityId> {
        let id = EntityId::now_v7();
        {
            let profile = root.profile_mut();
            profile.id = id;
            profile.role = R::KIND.role();
        }
        root.allocate_nested();

        let document = encode(R::KIND.entity_type(), &*root)?;
        let result = self
            .bounded(
                deadline,
                "insert_one",
                self.store.insert_one(R::KIND, document),
            )
            .await?;
        if !result.acknowledged {
            return Err(StorageError::WriteConcernFailure {
                entity_type: R::KIND.entity_type(),
                operation: "create".to_string(),
            }
            .into());
        }

        tracing::info!(root = %R::KIND, root_id = %id, "Root created");
        Ok(id)
    }

    pub async fn find_root<R: RootEntity>(
        &self,
        deadline: Deadline,
        id: EntityId,
    ) -> OrdeloResult<R> {
        let document = self
            .bounded(
                deadline,
                "find_one",
                self.store.find_one(R::KIND, &Filter::id(id), None),
            )
            .await?
            .ok_or_else(|| StorageError::not_found(R::KIND.entity_type(), id))?;
        Ok(decode(R::KIND.entity_type(), document)?)
    }

    pub async fn find_root_by_email<R: RootEntity>(
        &self,
        deadline: Deadline,
        email: &str,
    ) -> OrdeloResult<R> {
        let document = self
            .bounded(
                deadline,
                "find_one",
                self.store.find_one(R::KIND, &Filter::email(email), None),
            )
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity_type: R::KIND.entity_type(),
                key: email.to_string(),
            })?;
        Ok(decode(R::KIND.entity_type(), document)?)
    }

    /// Every root of `kind`, decoded as `T` after applying `projection`.
    pub async fn list<T: DeserializeOwned>(
        &self,
        deadline: Deadline,
        kind: RootKind,
        projection: &Projection,
    ) -> OrdeloResult<Vec<T>> {
        let documents = self
            .bounded(
                deadline,
                "find_many",
                self.store.find_many(kind, &Filter::All, Some(projection)),
            )
            .await?;
        let decoded = documents
            .into_iter()
            .map(|doc| decode(kind.entity_type(), doc))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(decoded)
    }

    /// Profile of every root of `kind`.
    pub async fn list_profiles(
        &self,
        deadline: Deadline,
        kind: RootKind,
    ) -> OrdeloResult<Vec<Profile>> {
        self.list(deadline, kind, &Projection::fields(PROFILE_FIELDS))
            .await
    }

    /// Set the specified scalar profile fields of an existing root.
    pub async fn update_profile(
        &self,
        deadline: Deadline,
        kind: RootKind,
        profile: &Profile,
    ) -> OrdeloResult<()> {
        if profile.id.is_nil() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "id".to_string(),
            }
            .into());
        }
        self.ensure_root(deadline, kind, profile.id).await?;

        let patch = profile.patch();
        if patch.is_empty() {
            return Err(StorageError::NoEffect {
                entity_type: kind.entity_type(),
                root_id: profile.id,
                reason: "no fields were specified".to_string(),
            }
            .into());
        }

        let result = self
            .bounded(
                deadline,
                "update_one",
                self.store
                    .update_one(kind, &Filter::id(profile.id), &Update::Set(patch)),
            )
            .await?;
        if !result.acknowledged {
            return Err(StorageError::WriteConcernFailure {
                entity_type: kind.entity_type(),
                operation: "update".to_string(),
            }
            .into());
        }
        if result.matched_count == 0 {
            return Err(StorageError::not_found(kind.entity_type(), profile.id).into());
        }
        if result.modified_count == 0 {
            return Err(StorageError::NoEffect {
                entity_type: kind.entity_type(),
                root_id: profile.id,
                reason: "specified fields already hold these values".to_string(),
            }
            .into());
        }

        tracing::info!(root = %kind, root_id = %profile.id, "Root profile updated");
        Ok(())
    }

    pub async fn delete_root(
        &self,
        deadline: Deadline,
        kind: RootKind,
        id: EntityId,
    ) -> OrdeloResult<()> {
        let result = self
            .bounded(
                deadline,
                "delete_one",
                self.store.delete_one(kind, &Filter::id(id)),
            )
            .await?;
        if !result.acknowledged {
            return Err(StorageError::WriteConcernFailure {
                entity_type: kind.entity_type(),
                operation: "delete".to_string(),
            }
            .into());
        }
        if result.deleted_count == 0 {
            return Err(StorageError::not_found(kind.entity_type(), id).into());
        }

        tracing::info!(root = %kind, root_id = %id, "Root deleted");
        Ok(())
    }

    // ========================================================================
    // CONTAINERS
    // ========================================================================

    /// Append new containers to a root. Returns their identifiers in order.
    pub async fn create_containers<C: Container>(
        &self,
        deadline: Deadline,
        root_id: EntityId,
        containers: &mut [C],
    ) -> OrdeloResult<Vec<EntityId>> {
        let root = <C::Root as RootEntity>::KIND;
        self.ensure_root(deadline, root, root_id).await?;
        if containers.is_empty() {
            return Err(no_effect(
                C::KIND.entity_type(),
                root_id,
                "no containers were supplied",
            ));
        }

        let (ids, plan) = plan_create(root_id, containers)?;
        self.execute(deadline, root, &plan).await?;

        tracing::info!(
            root_id = %root_id,
            kind = %C::KIND,
            count = ids.len(),
            "Containers created"
        );
        Ok(ids)
    }

    /// The root's `C` array, empty when the root has none.
    pub async fn find_containers<C: Container>(
        &self,
        deadline: Deadline,
        root_id: EntityId,
    ) -> OrdeloResult<Vec<C>> {
        let root = <C::Root as RootEntity>::KIND;
        let projection = Projection::containers(C::KIND);
        let document = self
            .bounded(
                deadline,
                "find_one",
                self.store
                    .find_one(root, &Filter::id(root_id), Some(&projection)),
            )
            .await?
            .ok_or_else(|| StorageError::not_found(root.entity_type(), root_id))?;

        match document.get(C::KIND.array_field()) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(array) => Ok(decode(C::KIND.entity_type(), array.clone())?),
        }
    }

    /// Partially update existing containers and their items.
    ///
    /// Containers with a nil id are skipped; when nothing is left to write
    /// the call succeeds without touching the store beyond the root check.
    /// Ids the root does not hold match nothing and are not reported: only
    /// acknowledgement is verified.
    pub async fn update_containers<C: Container>(
        &self,
        deadline: Deadline,
        root_id: EntityId,
        containers: &mut [C],
    ) -> OrdeloResult<()> {
        let root = <C::Root as RootEntity>::KIND;
        self.ensure_root(deadline, root, root_id).await?;

        let plan = plan_update(root_id, containers)?;
        if plan.is_empty() {
            tracing::debug!(root_id = %root_id, kind = %C::KIND, "Nothing to update");
            return Ok(());
        }
        let result = self.execute(deadline, root, &plan).await?;

        tracing::info!(
            root_id = %root_id,
            kind = %C::KIND,
            operations = plan.models().len(),
            modified = result.modified_count,
            "Containers updated"
        );
        Ok(())
    }

    /// Remove the `kind` containers listed in `ids`.
    pub async fn delete_containers(
        &self,
        deadline: Deadline,
        kind: ContainerKind,
        root_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let root = kind.root();
        self.ensure_root(deadline, root, root_id).await?;
        if ids.is_empty() {
            return Err(no_effect(
                kind.entity_type(),
                root_id,
                "no container ids were supplied",
            ));
        }

        self.execute(deadline, root, &plan_delete(kind, root_id, ids))
            .await?;

        tracing::info!(root_id = %root_id, kind = %kind, count = ids.len(), "Containers deleted");
        Ok(())
    }

    /// Remove items from one container of a `root` aggregate.
    pub async fn delete_items(
        &self,
        deadline: Deadline,
        root: RootKind,
        kind: ContainerKind,
        root_id: EntityId,
        container_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        kind.ensure_item_holder(root)?;
        self.ensure_root(deadline, root, root_id).await?;
        if ids.is_empty() {
            return Err(no_effect(EntityType::Item, root_id, "no item ids were supplied"));
        }

        let plan = plan_delete_items(kind, root_id, container_id, ids)?;
        self.execute(deadline, root, &plan).await?;

        tracing::info!(
            root_id = %root_id,
            container_id = %container_id,
            kind = %kind,
            count = ids.len(),
            "Items deleted"
        );
        Ok(())
    }
}

fn no_effect(entity_type: EntityType, root_id: EntityId, reason: &str) -> ordelo_core::OrdeloError {
    StorageError::NoEffect {
        entity_type,
        root_id,
        reason: reason.to_string(),
    }
    .into()
}

fn encode<T: Serialize>(entity_type: EntityType, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Codec {
        entity_type,
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(entity_type: EntityType, value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::Codec {
        entity_type,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InMemoryDocumentStore;
    use ordelo_core::{Cart, Item, OrdeloError, Recipe, User};
    use std::time::Duration;

    fn aggregate() -> (AggregateStore<InMemoryDocumentStore>, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new("ordelo_test"));
        (AggregateStore::new(Arc::clone(&store)), store)
    }

    async fn new_user(aggregate: &AggregateStore<InMemoryDocumentStore>) -> EntityId {
        let mut user = User {
            profile: Profile {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        aggregate
            .create_root(Deadline::none(), &mut user)
            .await
            .expect("create should succeed")
    }

    #[tokio::test]
    async fn test_create_root_persists_empty_arrays() {
        let (aggregate, store) = aggregate();
        let id = new_user(&aggregate).await;
        let doc = store.document(RootKind::User, id).expect("document should exist");
        assert_eq!(doc["saved_recipes"], serde_json::json!([]));
        assert_eq!(doc["carts"], serde_json::json!([]));
        assert_eq!(doc["orders"], serde_json::json!([]));
        assert_eq!(doc["role"], "user");
    }

    #[tokio::test]
    async fn test_find_root_by_email() {
        let (aggregate, _) = aggregate();
        let id = new_user(&aggregate).await;
        let user: User = aggregate
            .find_root_by_email(Deadline::none(), "ada@example.com")
            .await
            .expect("find should succeed");
        assert_eq!(user.profile.id, id);

        let missing = aggregate
            .find_root_by_email::<User>(Deadline::none(), "nobody@example.com")
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            OrdeloError::Storage(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_profile_requires_id() {
        let (aggregate, _) = aggregate();
        let err = aggregate
            .update_profile(Deadline::none(), RootKind::User, &Profile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrdeloError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_profile_with_nothing_specified_is_no_effect() {
        let (aggregate, _) = aggregate();
        let id = new_user(&aggregate).await;
        let err = aggregate
            .update_profile(
                Deadline::none(),
                RootKind::User,
                &Profile {
                    id,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrdeloError::Storage(StorageError::NoEffect { .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_container_update_keeps_other_fields() {
        let (aggregate, _) = aggregate();
        let user = new_user(&aggregate).await;
        let vendor_id = EntityId::now_v7();
        let mut carts = vec![Cart {
            vendor_id,
            total_price: 10.0,
            items: vec![Item {
                name: "flour".to_string(),
                quantity: 2,
                ..Default::default()
            }],
            ..Default::default()
        }];
        let ids = aggregate
            .create_containers(Deadline::none(), user, &mut carts)
            .await
            .expect("create should succeed");

        let mut update = vec![Cart {
            id: ids[0],
            total_price: 31.0,
            ..Default::default()
        }];
        aggregate
            .update_containers(Deadline::none(), user, &mut update)
            .await
            .expect("update should succeed");

        let stored: Vec<Cart> = aggregate
            .find_containers(Deadline::none(), user)
            .await
            .expect("find should succeed");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_price, 31.0);
        assert_eq!(stored[0].vendor_id, vendor_id);
        assert_eq!(stored[0].items, carts[0].items);
    }

    #[tokio::test]
    async fn test_delete_containers_not_found_vs_no_effect() {
        let (aggregate, _) = aggregate();
        let missing_root = aggregate
            .delete_containers(
                Deadline::none(),
                ContainerKind::Recipe,
                EntityId::now_v7(),
                &[EntityId::now_v7()],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            missing_root,
            OrdeloError::Storage(StorageError::NotFound { entity_type: EntityType::User, .. })
        ));

        let user = new_user(&aggregate).await;
        let nothing_matched = aggregate
            .delete_containers(
                Deadline::none(),
                ContainerKind::Recipe,
                user,
                &[EntityId::now_v7()],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            nothing_matched,
            OrdeloError::Storage(StorageError::NoEffect { entity_type: EntityType::Recipe, .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_items_from_recipe() {
        let (aggregate, _) = aggregate();
        let user = new_user(&aggregate).await;
        let mut recipes = vec![Recipe {
            title: "Dal".to_string(),
            items: vec![Item::default(), Item::default()],
            ..Default::default()
        }];
        let ids = aggregate
            .create_containers(Deadline::none(), user, &mut recipes)
            .await
            .expect("create should succeed");

        aggregate
            .delete_items(
                Deadline::none(),
                RootKind::User,
                ContainerKind::Recipe,
                user,
                ids[0],
                &[recipes[0].items[0].ingredient_id],
            )
            .await
            .expect("delete should succeed");

        let stored: Vec<Recipe> = aggregate
            .find_containers(Deadline::none(), user)
            .await
            .expect("find should succeed");
        assert_eq!(stored[0].items.len(), 1);
        assert_eq!(stored[0].items[0].ingredient_id, recipes[0].items[1].ingredient_id);
    }

    #[tokio::test]
    async fn test_unacknowledged_container_write() {
        let (aggregate, store) = aggregate();
        let user = new_user(&aggregate).await;
        store.set_acknowledge_writes(false);
        let err = aggregate
            .create_containers(Deadline::none(), user, &mut [Recipe::default()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrdeloError::Storage(StorageError::WriteConcernFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let (aggregate, store) = aggregate();
        store.set_latency(Duration::from_millis(200));
        let err = aggregate
            .find_root::<User>(Deadline::after(Duration::from_millis(10)), EntityId::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrdeloError::Storage(StorageError::Timeout { .. })
        ));
    }
}

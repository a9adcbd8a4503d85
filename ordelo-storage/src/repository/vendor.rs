//! Document-backed vendor repository.

use std::sync::Arc;

use async_trait::async_trait;
use ordelo_core::{
    ContainerKind, Deadline, EntityId, EntityType, IngredientRequirement, Item, OrdeloResult,
    RootKind, StorageError, Store, Vendor, VendorMatch, VendorOrder,
};

use super::matching::match_vendor;
use super::{AggregateStore, VendorRepository};
use crate::document::{DocumentStore, Projection};

/// [`VendorRepository`] over a document store.
pub struct DocumentVendorRepository<S: DocumentStore> {
    aggregate: AggregateStore<S>,
}

impl<S: DocumentStore> DocumentVendorRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            aggregate: AggregateStore::new(store),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> VendorRepository for DocumentVendorRepository<S> {
    async fn create_vendor(
        &self,
        deadline: Deadline,
        vendor: &mut Vendor,
    ) -> OrdeloResult<EntityId> {
        self.aggregate.create_root(deadline, vendor).await
    }

    async fn find_vendor_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Vendor> {
        self.aggregate.find_root(deadline, id).await
    }

    async fn find_vendor_by_email(
        &self,
        deadline: Deadline,
        email: &str,
    ) -> OrdeloResult<Vendor> {
        self.aggregate.find_root_by_email(deadline, email).await
    }

    async fn update_vendor(&self, deadline: Deadline, vendor: &Vendor) -> OrdeloResult<()> {
        self.aggregate
            .update_profile(deadline, RootKind::Vendor, &vendor.profile)
            .await
    }

    async fn delete_vendor(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        self.aggregate
            .delete_root(deadline, RootKind::Vendor, id)
            .await
    }

    async fn create_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, vendor_id, stores)
            .await
    }

    async fn find_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
    ) -> OrdeloResult<Vec<Store>> {
        self.aggregate.find_containers(deadline, vendor_id).await
    }

    async fn update_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, vendor_id, stores)
            .await
    }

    async fn delete_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::Store, vendor_id, ids)
            .await
    }

    async fn create_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, vendor_id, orders)
            .await
    }

    async fn find_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
    ) -> OrdeloResult<Vec<VendorOrder>> {
        self.aggregate.find_containers(deadline, vendor_id).await
    }

    async fn update_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, vendor_id, orders)
            .await
    }

    async fn delete_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::VendorOrder, vendor_id, ids)
            .await
    }

    async fn delete_items(
        &self,
        deadline: Deadline,
        kind: ContainerKind,
        vendor_id: EntityId,
        container_id: EntityId,
        item_ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_items(
                deadline,
                RootKind::Vendor,
                kind,
                vendor_id,
                container_id,
                item_ids,
            )
            .await
    }

    async fn find_store_items(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        store_id: EntityId,
    ) -> OrdeloResult<Vec<Item>> {
        let stores: Vec<Store> = self.aggregate.find_containers(deadline, vendor_id).await?;
        let store = stores
            .into_iter()
            .find(|store| store.id == store_id)
            .ok_or_else(|| StorageError::not_found(EntityType::Store, store_id))?;

        tracing::debug!(
            vendor_id = %vendor_id,
            store_id = %store_id,
            count = store.items.len(),
            "Store items found"
        );
        Ok(store.items)
    }

    async fn find_matching_ingredients(
        &self,
        deadline: Deadline,
        requirements: &[IngredientRequirement],
    ) -> OrdeloResult<Vec<VendorMatch>> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }

        let vendors: Vec<Vendor> = self
            .aggregate
            .list(
                deadline,
                RootKind::Vendor,
                &Projection::containers(ContainerKind::Store),
            )
            .await?;
        let matches: Vec<VendorMatch> = vendors
            .iter()
            .filter_map(|vendor| match_vendor(vendor, requirements))
            .collect();

        tracing::info!(
            requirements = requirements.len(),
            vendors = matches.len(),
            "Matched ingredients across vendors"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InMemoryDocumentStore;
    use ordelo_core::{OrdeloError, Profile};

    fn repository() -> DocumentVendorRepository<InMemoryDocumentStore> {
        DocumentVendorRepository::new(Arc::new(InMemoryDocumentStore::default()))
    }

    fn flour(unit_quantity: i32) -> Item {
        Item {
            name: "flour".to_string(),
            unit: "g".to_string(),
            unit_quantity,
            price: 1.2,
            quantity: 20,
            ..Default::default()
        }
    }

    async fn vendor_with_store(
        repo: &DocumentVendorRepository<InMemoryDocumentStore>,
        items: Vec<Item>,
    ) -> (EntityId, EntityId) {
        let mut vendor = Vendor {
            profile: Profile {
                name: "Mill".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let vendor_id = repo
            .create_vendor(Deadline::none(), &mut vendor)
            .await
            .expect("create should succeed");
        let ids = repo
            .create_stores(
                Deadline::none(),
                vendor_id,
                &mut [Store {
                    name: "Main".to_string(),
                    items,
                    ..Default::default()
                }],
            )
            .await
            .expect("create stores should succeed");
        (vendor_id, ids[0])
    }

    #[tokio::test]
    async fn test_find_store_items() {
        let repo = repository();
        let (vendor_id, store_id) = vendor_with_store(&repo, vec![flour(500)]).await;
        let items = repo
            .find_store_items(Deadline::none(), vendor_id, store_id)
            .await
            .expect("find should succeed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "flour");

        let err = repo
            .find_store_items(Deadline::none(), vendor_id, EntityId::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrdeloError::Storage(StorageError::NotFound { entity_type: EntityType::Store, .. })
        ));
    }

    #[tokio::test]
    async fn test_find_matching_ingredients() {
        let repo = repository();
        let (stocked, _) = vendor_with_store(&repo, vec![flour(1000), flour(500)]).await;
        vendor_with_store(&repo, vec![flour(100)]).await;

        let matches = repo
            .find_matching_ingredients(
                Deadline::none(),
                &[IngredientRequirement {
                    name: "flour".to_string(),
                    unit_quantity: 400,
                    unit: "g".to_string(),
                }],
            )
            .await
            .expect("match should succeed");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].vendor_id, stocked);
        assert_eq!(matches[0].stores[0].items[0].unit_quantity, 500);
    }
}

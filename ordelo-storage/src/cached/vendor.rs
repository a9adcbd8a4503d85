//! Cache-aside vendor repository.

use async_trait::async_trait;
use ordelo_core::{
    ContainerKind, Deadline, EntityId, IngredientRequirement, Item, OrdeloResult, RootKind, Store,
    Vendor, VendorMatch, VendorOrder,
};

use super::item_keys;
use crate::cache::{CacheAside, CacheKey, KeyValueCache};
use crate::repository::VendorRepository;

/// [`VendorRepository`] decorator backed by a key-value cache.
///
/// Store item lookups and ingredient matching are not cached.
pub struct CachedVendorRepository<R: VendorRepository, K: KeyValueCache> {
    inner: R,
    cache: CacheAside<K>,
}

impl<R: VendorRepository, K: KeyValueCache> CachedVendorRepository<R, K> {
    pub fn new(inner: R, cache: CacheAside<K>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cache(&self) -> &CacheAside<K> {
        &self.cache
    }
}

#[async_trait]
impl<R: VendorRepository, K: KeyValueCache> VendorRepository for CachedVendorRepository<R, K> {
    async fn create_vendor(
        &self,
        deadline: Deadline,
        vendor: &mut Vendor,
    ) -> OrdeloResult<EntityId> {
        self.inner.create_vendor(deadline, vendor).await
    }

    async fn find_vendor_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Vendor> {
        self.cache
            .read(deadline, CacheKey::root(RootKind::Vendor, id), || {
                self.inner.find_vendor_by_id(deadline, id)
            })
            .await
    }

    async fn find_vendor_by_email(
        &self,
        deadline: Deadline,
        email: &str,
    ) -> OrdeloResult<Vendor> {
        self.inner.find_vendor_by_email(deadline, email).await
    }

    async fn update_vendor(&self, deadline: Deadline, vendor: &Vendor) -> OrdeloResult<()> {
        let keys = [CacheKey::root(RootKind::Vendor, vendor.profile.id)];
        self.cache
            .write(deadline, &keys, self.inner.update_vendor(deadline, vendor))
            .await
    }

    async fn delete_vendor(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        let keys = CacheKey::all_for_root(RootKind::Vendor, id);
        self.cache
            .write(deadline, &keys, self.inner.delete_vendor(deadline, id))
            .await
    }

    async fn create_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::Store, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_stores(deadline, vendor_id, stores),
            )
            .await
    }

    async fn find_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
    ) -> OrdeloResult<Vec<Store>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::Store, vendor_id),
                || self.inner.find_stores(deadline, vendor_id),
            )
            .await
    }

    async fn update_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Store, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_stores(deadline, vendor_id, stores),
            )
            .await
    }

    async fn delete_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Store, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.delete_stores(deadline, vendor_id, ids),
            )
            .await
    }

    async fn create_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::VendorOrder, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_vendor_orders(deadline, vendor_id, orders),
            )
            .await
    }

    async fn find_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
    ) -> OrdeloResult<Vec<VendorOrder>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::VendorOrder, vendor_id),
                || self.inner.find_vendor_orders(deadline, vendor_id),
            )
            .await
    }

    async fn update_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::VendorOrder, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_vendor_orders(deadline, vendor_id, orders),
            )
            .await
    }

    async fn delete_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::VendorOrder, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.delete_vendor_orders(deadline, vendor_id, ids),
            )
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
        let keys = item_keys(RootKind::Vendor, kind, vendor_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner
                    .delete_items(deadline, kind, vendor_id, container_id, item_ids),
            )
            .await
    }

    async fn find_store_items(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        store_id: EntityId,
    ) -> OrdeloResult<Vec<Item>> {
        self.inner
            .find_store_items(deadline, vendor_id, store_id)
            .await
    }

    async fn find_matching_ingredients(
        &self,
        deadline: Deadline,
        requirements: &[IngredientRequirement],
    ) -> OrdeloResult<Vec<VendorMatch>> {
        self.inner
            .find_matching_ingredients(deadline, requirements)
            .await
    }
}

//! Cache-aside admin repository.

use async_trait::async_trait;
use ordelo_core::{
    Admin, ContainerKind, Deadline, EntityId, Ingredient, OrdeloResult, Profile, RootKind, Vendor,
};

use crate::cache::{CacheAside, CacheKey, KeyValueCache};
use crate::repository::AdminRepository;

/// [`AdminRepository`] decorator backed by a key-value cache.
///
/// Listings over users and vendors always read the store.
pub struct CachedAdminRepository<R: AdminRepository, K: KeyValueCache> {
    inner: R,
    cache: CacheAside<K>,
}

impl<R: AdminRepository, K: KeyValueCache> CachedAdminRepository<R, K> {
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
impl<R: AdminRepository, K: KeyValueCache> AdminRepository for CachedAdminRepository<R, K> {
    async fn create_admin(&self, deadline: Deadline, admin: &mut Admin) -> OrdeloResult<EntityId> {
        self.inner.create_admin(deadline, admin).await
    }

    async fn find_admin_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Admin> {
        self.cache
            .read(deadline, CacheKey::root(RootKind::Admin, id), || {
                self.inner.find_admin_by_id(deadline, id)
            })
            .await
    }

    async fn find_admin_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<Admin> {
        self.inner.find_admin_by_email(deadline, email).await
    }

    async fn update_admin(&self, deadline: Deadline, admin: &Admin) -> OrdeloResult<()> {
        let keys = [CacheKey::root(RootKind::Admin, admin.profile.id)];
        self.cache
            .write(deadline, &keys, self.inner.update_admin(deadline, admin))
            .await
    }

    async fn delete_admin(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        let keys = CacheKey::all_for_root(RootKind::Admin, id);
        self.cache
            .write(deadline, &keys, self.inner.delete_admin(deadline, id))
            .await
    }

    async fn create_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::Ingredient, admin_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_ingredients(deadline, admin_id, ingredients),
            )
            .await
    }

    async fn find_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
    ) -> OrdeloResult<Vec<Ingredient>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::Ingredient, admin_id),
                || self.inner.find_ingredients(deadline, admin_id),
            )
            .await
    }

    async fn update_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Ingredient, admin_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_ingredients(deadline, admin_id, ingredients),
            )
            .await
    }

    async fn delete_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Ingredient, admin_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.delete_ingredients(deadline, admin_id, ids),
            )
            .await
    }

    async fn find_users(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>> {
        self.inner.find_users(deadline).await
    }

    async fn find_vendors(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>> {
        self.inner.find_vendors(deadline).await
    }

    async fn find_vendor_stores(&self, deadline: Deadline) -> OrdeloResult<Vec<Vendor>> {
        self.inner.find_vendor_stores(deadline).await
    }
}

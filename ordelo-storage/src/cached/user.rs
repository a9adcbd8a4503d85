//! Cache-aside user repository.

use async_trait::async_trait;
use ordelo_core::{
    Cart, ContainerKind, Deadline, EntityId, OrdeloResult, Recipe, RootKind, User, UserOrder,
};

use super::item_keys;
use crate::cache::{CacheAside, CacheKey, KeyValueCache};
use crate::repository::UserRepository;

/// [`UserRepository`] decorator backed by a key-value cache.
pub struct CachedUserRepository<R: UserRepository, K: KeyValueCache> {
    inner: R,
    cache: CacheAside<K>,
}

impl<R: UserRepository, K: KeyValueCache> CachedUserRepository<R, K> {
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
impl<R: UserRepository, K: KeyValueCache> UserRepository for CachedUserRepository<R, K> {
    async fn create_user(&self, deadline: Deadline, user: &mut User) -> OrdeloResult<EntityId> {
        self.inner.create_user(deadline, user).await
    }

    async fn find_user_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<User> {
        self.cache
            .read(deadline, CacheKey::root(RootKind::User, id), || {
                self.inner.find_user_by_id(deadline, id)
            })
            .await
    }

    async fn find_user_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<User> {
        self.inner.find_user_by_email(deadline, email).await
    }

    async fn update_user(&self, deadline: Deadline, user: &User) -> OrdeloResult<()> {
        let keys = [CacheKey::root(RootKind::User, user.profile.id)];
        self.cache
            .write(deadline, &keys, self.inner.update_user(deadline, user))
            .await
    }

    async fn delete_user(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        let keys = CacheKey::all_for_root(RootKind::User, id);
        self.cache
            .write(deadline, &keys, self.inner.delete_user(deadline, id))
            .await
    }

    async fn create_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::Recipe, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_recipes(deadline, user_id, recipes),
            )
            .await
    }

    async fn find_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
    ) -> OrdeloResult<Vec<Recipe>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::Recipe, user_id),
                || self.inner.find_recipes(deadline, user_id),
            )
            .await
    }

    async fn update_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Recipe, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_recipes(deadline, user_id, recipes),
            )
            .await
    }

    async fn delete_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Recipe, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.delete_recipes(deadline, user_id, ids),
            )
            .await
    }

    async fn create_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::Cart, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_carts(deadline, user_id, carts),
            )
            .await
    }

    async fn find_carts(&self, deadline: Deadline, user_id: EntityId) -> OrdeloResult<Vec<Cart>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::Cart, user_id),
                || self.inner.find_carts(deadline, user_id),
            )
            .await
    }

    async fn update_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Cart, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_carts(deadline, user_id, carts),
            )
            .await
    }

    async fn delete_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::Cart, user_id);
        self.cache
            .write(deadline, &keys, self.inner.delete_carts(deadline, user_id, ids))
            .await
    }

    async fn create_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<Vec<EntityId>> {
        let keys = CacheKey::touched_by(ContainerKind::UserOrder, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.create_user_orders(deadline, user_id, orders),
            )
            .await
    }

    async fn find_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
    ) -> OrdeloResult<Vec<UserOrder>> {
        self.cache
            .read(
                deadline,
                CacheKey::containers(ContainerKind::UserOrder, user_id),
                || self.inner.find_user_orders(deadline, user_id),
            )
            .await
    }

    async fn update_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::UserOrder, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.update_user_orders(deadline, user_id, orders),
            )
            .await
    }

    async fn delete_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = CacheKey::touched_by(ContainerKind::UserOrder, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner.delete_user_orders(deadline, user_id, ids),
            )
            .await
    }

    async fn delete_items(
        &self,
        deadline: Deadline,
        kind: ContainerKind,
        user_id: EntityId,
        container_id: EntityId,
        item_ids: &[EntityId],
    ) -> OrdeloResult<()> {
        let keys = item_keys(RootKind::User, kind, user_id);
        self.cache
            .write(
                deadline,
                &keys,
                self.inner
                    .delete_items(deadline, kind, user_id, container_id, item_ids),
            )
            .await
    }
}

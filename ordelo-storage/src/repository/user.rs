//! Document-backed user repository.

use std::sync::Arc;

use async_trait::async_trait;
use ordelo_core::{
    Cart, ContainerKind, Deadline, EntityId, OrdeloResult, Recipe, RootKind, User, UserOrder,
};

use super::{AggregateStore, UserRepository};
use crate::document::DocumentStore;

/// [`UserRepository`] over a document store.
pub struct DocumentUserRepository<S: DocumentStore> {
    aggregate: AggregateStore<S>,
}

impl<S: DocumentStore> DocumentUserRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            aggregate: AggregateStore::new(store),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> UserRepository for DocumentUserRepository<S> {
    async fn create_user(&self, deadline: Deadline, user: &mut User) -> OrdeloResult<EntityId> {
        self.aggregate.create_root(deadline, user).await
    }

    async fn find_user_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<User> {
        self.aggregate.find_root(deadline, id).await
    }

    async fn find_user_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<User> {
        self.aggregate.find_root_by_email(deadline, email).await
    }

    async fn update_user(&self, deadline: Deadline, user: &User) -> OrdeloResult<()> {
        self.aggregate
            .update_profile(deadline, RootKind::User, &user.profile)
            .await
    }

    async fn delete_user(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        self.aggregate.delete_root(deadline, RootKind::User, id).await
    }

    async fn create_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, user_id, recipes)
            .await
    }

    async fn find_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
    ) -> OrdeloResult<Vec<Recipe>> {
        self.aggregate.find_containers(deadline, user_id).await
    }

    async fn update_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, user_id, recipes)
            .await
    }

    async fn delete_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::Recipe, user_id, ids)
            .await
    }

    async fn create_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, user_id, carts)
            .await
    }

    async fn find_carts(&self, deadline: Deadline, user_id: EntityId) -> OrdeloResult<Vec<Cart>> {
        self.aggregate.find_containers(deadline, user_id).await
    }

    async fn update_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, user_id, carts)
            .await
    }

    async fn delete_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::Cart, user_id, ids)
            .await
    }

    async fn create_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, user_id, orders)
            .await
    }

    async fn find_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
    ) -> OrdeloResult<Vec<UserOrder>> {
        self.aggregate.find_containers(deadline, user_id).await
    }

    async fn update_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, user_id, orders)
            .await
    }

    async fn delete_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::UserOrder, user_id, ids)
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
        self.aggregate
            .delete_items(deadline, RootKind::User, kind, user_id, container_id, item_ids)
            .await
    }
}

//! Document-backed admin repository.
//!
//! Besides the admin aggregate itself, admins get read-only listings over
//! the user and vendor collections.

use std::sync::Arc;

use async_trait::async_trait;
use ordelo_core::{
    Admin, ContainerKind, Deadline, EntityId, Ingredient, OrdeloResult, Profile, RootKind, Vendor,
};

use super::aggregate::PROFILE_FIELDS;
use super::{AdminRepository, AggregateStore};
use crate::document::{DocumentStore, Projection};

/// [`AdminRepository`] over a document store.
pub struct DocumentAdminRepository<S: DocumentStore> {
    aggregate: AggregateStore<S>,
}

impl<S: DocumentStore> DocumentAdminRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            aggregate: AggregateStore::new(store),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> AdminRepository for DocumentAdminRepository<S> {
    async fn create_admin(&self, deadline: Deadline, admin: &mut Admin) -> OrdeloResult<EntityId> {
        self.aggregate.create_root(deadline, admin).await
    }

    async fn find_admin_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Admin> {
        self.aggregate.find_root(deadline, id).await
    }

    async fn find_admin_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<Admin> {
        self.aggregate.find_root_by_email(deadline, email).await
    }

    async fn update_admin(&self, deadline: Deadline, admin: &Admin) -> OrdeloResult<()> {
        self.aggregate
            .update_profile(deadline, RootKind::Admin, &admin.profile)
            .await
    }

    async fn delete_admin(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()> {
        self.aggregate
            .delete_root(deadline, RootKind::Admin, id)
            .await
    }

    async fn create_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<Vec<EntityId>> {
        self.aggregate
            .create_containers(deadline, admin_id, ingredients)
            .await
    }

    async fn find_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
    ) -> OrdeloResult<Vec<Ingredient>> {
        self.aggregate.find_containers(deadline, admin_id).await
    }

    async fn update_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<()> {
        self.aggregate
            .update_containers(deadline, admin_id, ingredients)
            .await
    }

    async fn delete_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()> {
        self.aggregate
            .delete_containers(deadline, ContainerKind::Ingredient, admin_id, ids)
            .await
    }

    async fn find_users(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>> {
        self.aggregate
            .list_profiles(deadline, RootKind::User)
            .await
    }

    async fn find_vendors(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>> {
        self.aggregate
            .list_profiles(deadline, RootKind::Vendor)
            .await
    }

    async fn find_vendor_stores(&self, deadline: Deadline) -> OrdeloResult<Vec<Vendor>> {
        let mut fields = PROFILE_FIELDS.to_vec();
        fields.push(ContainerKind::Store.array_field());
        let vendors: Vec<Vendor> = self
            .aggregate
            .list(deadline, RootKind::Vendor, &Projection::fields(&fields))
            .await?;
        Ok(vendors
            .into_iter()
            .filter(|vendor| !vendor.stores.is_empty())
            .collect())
    }
}

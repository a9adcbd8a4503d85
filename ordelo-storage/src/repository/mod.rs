//! Root repositories.
//!
//! One trait per root kind. The document-backed implementations in this
//! module talk to a [`DocumentStore`](crate::document::DocumentStore); the
//! cache-aside decorators in [`crate::cached`] implement the same traits, so
//! callers can swap one for the other.
//!
//! Every method takes the caller's [`Deadline`] first.
//!
//! Container updates (`update_recipes`, `update_stores`, ...) are partial and
//! only check that the store acknowledged the write:
//! - containers with a nil id are skipped as not yet persisted
//! - containers whose id the root does not hold match nothing and are
//!   silently ignored, so the call still returns `Ok(())`
//!
//! Deletes, by contrast, report `NoEffect` when nothing was removed.

pub mod admin;
pub mod aggregate;
pub mod matching;
pub mod user;
pub mod vendor;

pub use admin::DocumentAdminRepository;
pub use aggregate::{AggregateStore, PROFILE_FIELDS};
pub use matching::{best_item, match_store_items, match_vendor};
pub use user::DocumentUserRepository;
pub use vendor::DocumentVendorRepository;

use async_trait::async_trait;
use ordelo_core::{
    Admin, Cart, ContainerKind, Deadline, EntityId, Ingredient, IngredientRequirement, Item,
    OrdeloResult, Profile, Recipe, Store, User, UserOrder, Vendor, VendorMatch, VendorOrder,
};

// ============================================================================
// USER
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, deadline: Deadline, user: &mut User) -> OrdeloResult<EntityId>;

    async fn find_user_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<User>;

    async fn find_user_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<User>;

    /// Set the non-empty profile fields of `user`.
    async fn update_user(&self, deadline: Deadline, user: &User) -> OrdeloResult<()>;

    async fn delete_user(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()>;

    async fn create_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_recipes(&self, deadline: Deadline, user_id: EntityId)
        -> OrdeloResult<Vec<Recipe>>;

    async fn update_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        recipes: &mut [Recipe],
    ) -> OrdeloResult<()>;

    async fn delete_recipes(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    async fn create_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_carts(&self, deadline: Deadline, user_id: EntityId) -> OrdeloResult<Vec<Cart>>;

    async fn update_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        carts: &mut [Cart],
    ) -> OrdeloResult<()>;

    async fn delete_carts(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    async fn create_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
    ) -> OrdeloResult<Vec<UserOrder>>;

    async fn update_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        orders: &mut [UserOrder],
    ) -> OrdeloResult<()>;

    async fn delete_user_orders(
        &self,
        deadline: Deadline,
        user_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    /// Remove items from one recipe, cart or order of the user.
    async fn delete_items(
        &self,
        deadline: Deadline,
        kind: ContainerKind,
        user_id: EntityId,
        container_id: EntityId,
        item_ids: &[EntityId],
    ) -> OrdeloResult<()>;
}

// ============================================================================
// VENDOR
// ============================================================================

#[async_trait]
pub trait VendorRepository: Send + Sync {
    async fn create_vendor(&self, deadline: Deadline, vendor: &mut Vendor)
        -> OrdeloResult<EntityId>;

    async fn find_vendor_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Vendor>;

    async fn find_vendor_by_email(&self, deadline: Deadline, email: &str)
        -> OrdeloResult<Vendor>;

    async fn update_vendor(&self, deadline: Deadline, vendor: &Vendor) -> OrdeloResult<()>;

    async fn delete_vendor(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()>;

    async fn create_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_stores(&self, deadline: Deadline, vendor_id: EntityId)
        -> OrdeloResult<Vec<Store>>;

    async fn update_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        stores: &mut [Store],
    ) -> OrdeloResult<()>;

    async fn delete_stores(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    async fn create_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
    ) -> OrdeloResult<Vec<VendorOrder>>;

    async fn update_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        orders: &mut [VendorOrder],
    ) -> OrdeloResult<()>;

    async fn delete_vendor_orders(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    /// Remove items from one store or order of the vendor.
    async fn delete_items(
        &self,
        deadline: Deadline,
        kind: ContainerKind,
        vendor_id: EntityId,
        container_id: EntityId,
        item_ids: &[EntityId],
    ) -> OrdeloResult<()>;

    /// Items stocked by one store.
    async fn find_store_items(
        &self,
        deadline: Deadline,
        vendor_id: EntityId,
        store_id: EntityId,
    ) -> OrdeloResult<Vec<Item>>;

    /// Vendors whose stores can satisfy at least one requirement.
    async fn find_matching_ingredients(
        &self,
        deadline: Deadline,
        requirements: &[IngredientRequirement],
    ) -> OrdeloResult<Vec<VendorMatch>>;
}

// ============================================================================
// ADMIN
// ============================================================================

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn create_admin(&self, deadline: Deadline, admin: &mut Admin) -> OrdeloResult<EntityId>;

    async fn find_admin_by_id(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<Admin>;

    async fn find_admin_by_email(&self, deadline: Deadline, email: &str) -> OrdeloResult<Admin>;

    async fn update_admin(&self, deadline: Deadline, admin: &Admin) -> OrdeloResult<()>;

    async fn delete_admin(&self, deadline: Deadline, id: EntityId) -> OrdeloResult<()>;

    async fn create_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<Vec<EntityId>>;

    async fn find_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
    ) -> OrdeloResult<Vec<Ingredient>>;

    async fn update_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ingredients: &mut [Ingredient],
    ) -> OrdeloResult<()>;

    async fn delete_ingredients(
        &self,
        deadline: Deadline,
        admin_id: EntityId,
        ids: &[EntityId],
    ) -> OrdeloResult<()>;

    /// Profiles of every user.
    async fn find_users(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>>;

    /// Profiles of every vendor.
    async fn find_vendors(&self, deadline: Deadline) -> OrdeloResult<Vec<Profile>>;

    /// Every vendor that owns at least one store, with profile and stores only.
    async fn find_vendor_stores(&self, deadline: Deadline) -> OrdeloResult<Vec<Vendor>>;
}

//! Aggregate entities: roots, their containers, and leaf items.
//!
//! Ownership is a strict tree. A root exclusively owns its container arrays,
//! a container exclusively owns its item array, and nothing points back up.

use crate::{allocate_containers, ContainerKind, EntityId, FieldPatch, Role, RootKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Key field of root documents and of container elements.
pub const ID_FIELD: &str = "_id";
/// Key field of items and of catalog ingredients.
pub const ITEM_ID_FIELD: &str = "ingredient_id";
/// Array field holding a container's items.
pub const ITEMS_FIELD: &str = "items";

// ============================================================================
// TRAITS
// ============================================================================

/// A root aggregate persisted as one document.
pub trait RootEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RootKind;

    fn profile(&self) -> &Profile;

    fn profile_mut(&mut self) -> &mut Profile;

    /// Assign fresh identifiers to every embedded container and item.
    fn allocate_nested(&mut self);
}

/// An element of one of a root's container arrays.
///
/// `Root` ties each container type to the only aggregate allowed to hold it,
/// so a recipe can never be pushed into a vendor document.
pub trait Container: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Root: RootEntity;

    const KIND: ContainerKind;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    fn items(&self) -> &[Item] {
        &[]
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut []
    }

    /// Scalar fields to `$set` on a partial update.
    fn patch(&self) -> FieldPatch;
}

// ============================================================================
// ROOTS
// ============================================================================

/// Scalar fields shared by every root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub address: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl Profile {
    pub fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .text("name", &self.name)
            .text("address", &self.address)
            .text("email", &self.email)
            .text("password_hash", &self.password_hash)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(flatten)]
    pub profile: Profile,
    pub saved_recipes: Vec<Recipe>,
    pub carts: Vec<Cart>,
    pub orders: Vec<UserOrder>,
}

impl RootEntity for User {
    const KIND: RootKind = RootKind::User;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    fn allocate_nested(&mut self) {
        allocate_containers(&mut self.saved_recipes);
        allocate_containers(&mut self.carts);
        allocate_containers(&mut self.orders);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vendor {
    #[serde(flatten)]
    pub profile: Profile,
    pub stores: Vec<Store>,
    pub orders: Vec<VendorOrder>,
}

impl RootEntity for Vendor {
    const KIND: RootKind = RootKind::Vendor;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    fn allocate_nested(&mut self) {
        allocate_containers(&mut self.stores);
        allocate_containers(&mut self.orders);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    #[serde(flatten)]
    pub profile: Profile,
    pub ingredients: Vec<Ingredient>,
}

impl RootEntity for Admin {
    const KIND: RootKind = RootKind::Admin;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    fn allocate_nested(&mut self) {
        allocate_containers(&mut self.ingredients);
    }
}

// ============================================================================
// ITEMS
// ============================================================================

/// Catalog ingredient. Admins keep these directly; they own no items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    pub ingredient_id: EntityId,
    pub name: String,
    pub unit_quantity: i32,
    pub unit: String,
    pub price: f64,
}

/// An ingredient together with the quantity held by a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub ingredient_id: EntityId,
    pub name: String,
    pub unit_quantity: i32,
    pub unit: String,
    pub price: f64,
    pub quantity: i32,
}

impl Item {
    pub fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .text("name", &self.name)
            .int("unit_quantity", i64::from(self.unit_quantity))
            .text("unit", &self.unit)
            .float("price", self.price)
            .int("quantity", i64::from(self.quantity))
    }
}

impl Container for Ingredient {
    type Root = Admin;
    const KIND: ContainerKind = ContainerKind::Ingredient;

    fn id(&self) -> EntityId {
        self.ingredient_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.ingredient_id = id;
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .text("name", &self.name)
            .int("unit_quantity", i64::from(self.unit_quantity))
            .text("unit", &self.unit)
            .float("price", self.price)
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub preparation_time: i32,
    pub serving_size: i32,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cart {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub vendor_id: EntityId,
    pub store_id: EntityId,
    pub total_price: f64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserOrder {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub store_id: EntityId,
    pub vendor_id: EntityId,
    pub delivery_method: String,
    pub order_status: String,
    pub payment_status: String,
    pub total_price: f64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorOrder {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub store_id: EntityId,
    pub user_id: EntityId,
    pub delivery_method: String,
    pub order_status: String,
    pub total_price: f64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub store_type: String,
    pub location: Option<Location>,
    pub items: Vec<Item>,
}

/// GeoJSON geometry, in practice always a `Point`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: vec![longitude, latitude],
        }
    }
}

impl Container for Recipe {
    type Root = User;
    const KIND: ContainerKind = ContainerKind::Recipe;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .text("title", &self.title)
            .text("description", &self.description)
            .int("preparation_time", i64::from(self.preparation_time))
            .int("serving_size", i64::from(self.serving_size))
    }
}

impl Container for Cart {
    type Root = User;
    const KIND: ContainerKind = ContainerKind::Cart;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .id("vendor_id", self.vendor_id)
            .id("store_id", self.store_id)
            .float("total_price", self.total_price)
    }
}

impl Container for UserOrder {
    type Root = User;
    const KIND: ContainerKind = ContainerKind::UserOrder;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .id("store_id", self.store_id)
            .id("vendor_id", self.vendor_id)
            .text("delivery_method", &self.delivery_method)
            .text("order_status", &self.order_status)
            .text("payment_status", &self.payment_status)
            .float("total_price", self.total_price)
    }
}

impl Container for VendorOrder {
    type Root = Vendor;
    const KIND: ContainerKind = ContainerKind::VendorOrder;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .id("store_id", self.store_id)
            .id("user_id", self.user_id)
            .text("delivery_method", &self.delivery_method)
            .text("order_status", &self.order_status)
            .float("total_price", self.total_price)
    }
}

impl Container for Store {
    type Root = Vendor;
    const KIND: ContainerKind = ContainerKind::Store;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    fn patch(&self) -> FieldPatch {
        FieldPatch::new()
            .text("name", &self.name)
            .text("store_type", &self.store_type)
            .optional("location", self.location.as_ref())
    }
}

// ============================================================================
// INGREDIENT MATCHING
// ============================================================================

/// One ingredient a shopper needs: at least `unit_quantity` of `unit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngredientRequirement {
    pub name: String,
    pub unit_quantity: i32,
    pub unit: String,
}

/// Stores of one vendor that can satisfy at least one requirement, each
/// reduced to its best-matching items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorMatch {
    pub vendor_id: EntityId,
    pub stores: Vec<Store>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_arrays_default_to_empty() {
        let user: User = serde_json::from_value(json!({
            "_id": EntityId::now_v7(),
            "name": "Ada",
            "email": "ada@example.com"
        }))
        .expect("deserialize should succeed");
        assert!(user.saved_recipes.is_empty());
        assert!(user.carts.is_empty());
        assert!(user.orders.is_empty());

        let value = serde_json::to_value(&user).expect("serialize should succeed");
        assert_eq!(value["saved_recipes"], json!([]));
        assert_eq!(value["carts"], json!([]));
        assert_eq!(value["orders"], json!([]));
    }

    #[test]
    fn test_profile_flattens_into_root_document() {
        let user = User {
            profile: Profile {
                id: EntityId::now_v7(),
                name: "Ada".to_string(),
                role: Role::User,
                ..Default::default()
            },
            ..Default::default()
        };
        let value = serde_json::to_value(&user).expect("serialize should succeed");
        assert_eq!(value["_id"], json!(user.profile.id.to_string()));
        assert_eq!(value["role"], json!("user"));
        assert!(value.get("profile").is_none());
    }

    #[test]
    fn test_item_patch_skips_defaults() {
        let item = Item {
            price: 4.25,
            ..Default::default()
        };
        let patch = item.patch();
        assert_eq!(patch.len(), 1);
        assert!(patch.get("price").is_some());
    }

    #[test]
    fn test_cart_patch_only_total_price() {
        let cart = Cart {
            id: EntityId::now_v7(),
            total_price: 31.0,
            ..Default::default()
        };
        assert_eq!(cart.patch().field_names(), vec!["total_price"]);
    }

    #[test]
    fn test_store_patch_includes_location() {
        let store = Store {
            location: Some(Location::point(13.4, 52.5)),
            ..Default::default()
        };
        let patch = store.patch();
        assert_eq!(
            patch.get("location"),
            Some(&json!({"type": "Point", "coordinates": [13.4, 52.5]}))
        );
    }

    #[test]
    fn test_ingredient_has_no_items() {
        let mut ingredient = Ingredient::default();
        assert!(ingredient.items().is_empty());
        assert!(ingredient.items_mut().is_empty());
    }

    #[test]
    fn test_allocate_nested_covers_all_arrays() {
        let mut vendor = Vendor {
            stores: vec![Store {
                items: vec![Item::default()],
                ..Default::default()
            }],
            orders: vec![VendorOrder::default()],
            ..Default::default()
        };
        vendor.allocate_nested();
        assert!(!vendor.stores[0].id.is_nil());
        assert!(!vendor.stores[0].items[0].ingredient_id.is_nil());
        assert!(!vendor.orders[0].id.is_nil());
    }
}

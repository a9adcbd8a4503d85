//! Ordelo Core - Entity Types and Shared Primitives
//!
//! Root aggregates (users, vendors, admins), the containers they embed and
//! the items those containers hold, plus the identifier, error, deadline and
//! configuration types shared by the storage crate.

pub mod config;
pub mod deadline;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod patch;
pub mod telemetry;

pub use config::OrdeloConfig;
pub use deadline::{Deadline, DeadlineExceeded};
pub use entities::{
    Admin, Cart, Container, Ingredient, IngredientRequirement, Item, Location, Profile, Recipe,
    RootEntity, Store, User, UserOrder, Vendor, VendorMatch, VendorOrder, ID_FIELD, ITEMS_FIELD,
    ITEM_ID_FIELD,
};
pub use enums::{ContainerKind, EntityType, Role, RootKind, RootKindParseError};
pub use error::{
    CacheError, ConfigError, OrdeloError, OrdeloResult, StorageError, ValidationError,
};
pub use identity::{allocate_containers, allocate_missing_items, new_entity_id, EntityId};
pub use patch::FieldPatch;
pub use telemetry::{init_tracing, TelemetryConfig};

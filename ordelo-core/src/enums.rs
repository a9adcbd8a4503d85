//! Enum types for Ordelo entities

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Entity type discriminator used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Vendor,
    Admin,
    Recipe,
    Cart,
    UserOrder,
    VendorOrder,
    Store,
    Ingredient,
    Item,
}

/// Role carried on a root profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Vendor,
    Admin,
}

impl Role {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// ROOT KINDS
// ============================================================================

/// The three aggregate roots. Each root kind maps to one collection of
/// documents and one cache key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    User,
    Vendor,
    Admin,
}

impl RootKind {
    /// Collection name in the document store, also the cache key prefix.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RootKind::User => "user",
            RootKind::Vendor => "vendor",
            RootKind::Admin => "admin",
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            RootKind::User => EntityType::User,
            RootKind::Vendor => EntityType::Vendor,
            RootKind::Admin => EntityType::Admin,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RootKind::User => Role::User,
            RootKind::Vendor => Role::Vendor,
            RootKind::Admin => Role::Admin,
        }
    }

    /// Container kinds embedded in documents of this root kind.
    pub fn container_kinds(&self) -> &'static [ContainerKind] {
        match self {
            RootKind::User => &[
                ContainerKind::Recipe,
                ContainerKind::Cart,
                ContainerKind::UserOrder,
            ],
            RootKind::Vendor => &[ContainerKind::Store, ContainerKind::VendorOrder],
            RootKind::Admin => &[ContainerKind::Ingredient],
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for RootKind {
    type Err = RootKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(RootKind::User),
            "vendor" => Ok(RootKind::Vendor),
            "admin" => Ok(RootKind::Admin),
            _ => Err(RootKindParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid root kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootKindParseError(pub String);

impl fmt::Display for RootKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid root kind: {}", self.0)
    }
}

impl std::error::Error for RootKindParseError {}

// ============================================================================
// CONTAINER KINDS
// ============================================================================

/// Closed set of container kinds. Orders exist twice because user orders and
/// vendor orders carry different counterpart fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Recipe,
    Cart,
    UserOrder,
    Store,
    VendorOrder,
    Ingredient,
}

impl ContainerKind {
    pub fn root(&self) -> RootKind {
        match self {
            ContainerKind::Recipe | ContainerKind::Cart | ContainerKind::UserOrder => {
                RootKind::User
            }
            ContainerKind::Store | ContainerKind::VendorOrder => RootKind::Vendor,
            ContainerKind::Ingredient => RootKind::Admin,
        }
    }

    /// Array field holding containers of this kind inside the root document.
    pub fn array_field(&self) -> &'static str {
        match self {
            ContainerKind::Recipe => "saved_recipes",
            ContainerKind::Cart => "carts",
            ContainerKind::UserOrder | ContainerKind::VendorOrder => "orders",
            ContainerKind::Store => "stores",
            ContainerKind::Ingredient => "ingredients",
        }
    }

    /// Plural used as the last segment of container cache keys.
    pub fn plural(&self) -> &'static str {
        match self {
            ContainerKind::Recipe => "recipes",
            ContainerKind::Cart => "carts",
            ContainerKind::UserOrder | ContainerKind::VendorOrder => "orders",
            ContainerKind::Store => "stores",
            ContainerKind::Ingredient => "ingredients",
        }
    }

    /// Key field identifying one element of the container array.
    pub fn id_field(&self) -> &'static str {
        match self {
            ContainerKind::Ingredient => crate::ITEM_ID_FIELD,
            _ => crate::ID_FIELD,
        }
    }

    /// Whether elements of this kind own an item array.
    pub fn has_items(&self) -> bool {
        !matches!(self, ContainerKind::Ingredient)
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            ContainerKind::Recipe => EntityType::Recipe,
            ContainerKind::Cart => EntityType::Cart,
            ContainerKind::UserOrder => EntityType::UserOrder,
            ContainerKind::Store => EntityType::Store,
            ContainerKind::VendorOrder => EntityType::VendorOrder,
            ContainerKind::Ingredient => EntityType::Ingredient,
        }
    }

    /// Resolve a runtime container name for the given root kind.
    ///
    /// Accepts either the array field (`saved_recipes`) or the plural
    /// (`recipes`). Anything else is `UnknownContainerKind`.
    pub fn parse(root: RootKind, name: &str) -> Result<Self, StorageError> {
        let wanted = name.trim().to_lowercase();
        root.container_kinds()
            .iter()
            .copied()
            .find(|kind| kind.array_field() == wanted || kind.plural() == wanted)
            .ok_or_else(|| StorageError::UnknownContainerKind {
                root,
                name: name.to_string(),
            })
    }

    /// Ensure this kind belongs to `root` and owns items.
    pub fn ensure_item_holder(&self, root: RootKind) -> Result<(), StorageError> {
        if self.root() != root || !self.has_items() {
            return Err(StorageError::UnknownContainerKind {
                root,
                name: self.plural().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_field_and_plural() {
        assert_eq!(
            ContainerKind::parse(RootKind::User, "saved_recipes").expect("field should parse"),
            ContainerKind::Recipe
        );
        assert_eq!(
            ContainerKind::parse(RootKind::User, "Recipes").expect("plural should parse"),
            ContainerKind::Recipe
        );
        assert_eq!(
            ContainerKind::parse(RootKind::Vendor, "orders").expect("orders should parse"),
            ContainerKind::VendorOrder
        );
    }

    #[test]
    fn test_parse_rejects_foreign_kind() {
        let err = ContainerKind::parse(RootKind::Vendor, "carts").unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnknownContainerKind { root: RootKind::Vendor, .. }
        ));
    }

    #[test]
    fn test_ingredient_catalog_holds_no_items() {
        assert!(ContainerKind::Ingredient
            .ensure_item_holder(RootKind::Admin)
            .is_err());
        assert!(ContainerKind::Store.ensure_item_holder(RootKind::Vendor).is_ok());
        assert!(ContainerKind::Store.ensure_item_holder(RootKind::User).is_err());
    }

    #[test]
    fn test_every_kind_belongs_to_its_root() {
        for root in [RootKind::User, RootKind::Vendor, RootKind::Admin] {
            for kind in root.container_kinds() {
                assert_eq!(kind.root(), root);
            }
        }
    }

    #[test]
    fn test_root_kind_from_str() {
        assert_eq!("Vendor".parse::<RootKind>(), Ok(RootKind::Vendor));
        assert!("store".parse::<RootKind>().is_err());
    }
}

//! Identity types and the identity allocator for Ordelo entities

use crate::{Container, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier for roots, containers and items.
///
/// Backed by a UUIDv7 so identifiers sort by creation time. The nil UUID
/// stands for "not yet assigned": it is the serde default, and no write path
/// ever persists it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// The unassigned identifier.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Generate a fresh timestamp-sortable identifier.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ValidationError::InvalidValue {
                field: "id".to_string(),
                reason: format!("'{}' is not a valid identifier: {}", s, e),
            })
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    EntityId::now_v7()
}

// ============================================================================
// IDENTITY ALLOCATOR
// ============================================================================

/// Assign fresh identifiers to a batch of new containers and all of their items.
///
/// Used on the create path only: any identifier the caller supplied is
/// replaced. Returns the container identifiers in input order.
pub fn allocate_containers<C: Container>(containers: &mut [C]) -> Vec<EntityId> {
    containers
        .iter_mut()
        .map(|container| {
            let id = new_entity_id();
            container.set_id(id);
            for item in container.items_mut() {
                item.ingredient_id = new_entity_id();
            }
            id
        })
        .collect()
}

/// Assign identifiers to the items of an existing container that have none.
///
/// Returns the positions of the items that were assigned, in order. Items
/// that already carry an identifier are left untouched.
pub fn allocate_missing_items<C: Container>(container: &mut C) -> Vec<usize> {
    container
        .items_mut()
        .iter_mut()
        .enumerate()
        .filter(|(_, item)| item.ingredient_id.is_nil())
        .map(|(index, item)| {
            item.ingredient_id = new_entity_id();
            index
        })
        .collect()
}

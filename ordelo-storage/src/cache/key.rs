//! Cache keys for root snapshots and container arrays.
//!
//! Keys are only built from a root kind and a root identifier, so a key can
//! never name a container array without also naming its owner.
//!
//! Text format:
//! - `<root>:<id>` for the root snapshot, e.g. `user:0190…`
//! - `<root>:<id>:<plural>` for one container array, e.g. `user:0190…:recipes`

use std::fmt;

use ordelo_core::{ContainerKind, EntityId, RootKind};

const SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: CacheKeyInner,
}

/// Private inner struct - prevents external construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    root: RootKind,
    root_id: EntityId,
    containers: Option<ContainerKind>,
}

impl CacheKey {
    /// Key of a root snapshot.
    pub fn root(root: RootKind, root_id: EntityId) -> Self {
        Self {
            inner: CacheKeyInner {
                root,
                root_id,
                containers: None,
            },
        }
    }

    /// Key of one container array. The owning root kind comes from `kind`.
    pub fn containers(kind: ContainerKind, root_id: EntityId) -> Self {
        Self {
            inner: CacheKeyInner {
                root: kind.root(),
                root_id,
                containers: Some(kind),
            },
        }
    }

    /// Keys a write to `kind` containers can make stale.
    pub fn touched_by(kind: ContainerKind, root_id: EntityId) -> Vec<Self> {
        vec![Self::root(kind.root(), root_id), Self::containers(kind, root_id)]
    }

    /// The root key plus every container key of that root.
    pub fn all_for_root(root: RootKind, root_id: EntityId) -> Vec<Self> {
        std::iter::once(Self::root(root, root_id))
            .chain(
                root.container_kinds()
                    .iter()
                    .map(|kind| Self::containers(*kind, root_id)),
            )
            .collect()
    }

    pub fn root_kind(&self) -> RootKind {
        self.inner.root
    }

    pub fn root_id(&self) -> EntityId {
        self.inner.root_id
    }

    /// Container kind, `None` for a root snapshot key.
    pub fn container_kind(&self) -> Option<ContainerKind> {
        self.inner.containers
    }

    /// Byte form used by binary stores.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.inner.root.as_db_str(),
            SEPARATOR,
            self.inner.root_id
        )?;
        if let Some(kind) = self.inner.containers {
            write!(f, "{}{}", SEPARATOR, kind.plural())?;
        }
        Ok(())
    }
}

//! Cache-aside repository decorators.
//!
//! Each decorator wraps any implementation of a root repository trait and
//! implements the same trait. Find-by-id and find-containers read through
//! the cache; every write goes to the wrapped repository first and then
//! invalidates the keys it could have made stale. Secondary-key reads and
//! listings always go to the wrapped repository.

pub mod admin;
pub mod user;
pub mod vendor;

pub use admin::CachedAdminRepository;
pub use user::CachedUserRepository;
pub use vendor::CachedVendorRepository;

use ordelo_core::{ContainerKind, EntityId, RootKind};

use crate::cache::CacheKey;

/// Keys an item deletion on `kind` under a `root` aggregate can make stale.
///
/// A kind owned by another root kind only touches the root key; the wrapped
/// repository rejects such a call anyway.
pub(crate) fn item_keys(root: RootKind, kind: ContainerKind, root_id: EntityId) -> Vec<CacheKey> {
    if kind.root() == root {
        CacheKey::touched_by(kind, root_id)
    } else {
        vec![CacheKey::root(root, root_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_keys_stay_within_root() {
        let id = EntityId::now_v7();
        assert_eq!(
            item_keys(RootKind::User, ContainerKind::Cart, id),
            vec![
                CacheKey::root(RootKind::User, id),
                CacheKey::containers(ContainerKind::Cart, id)
            ]
        );
        assert_eq!(
            item_keys(RootKind::User, ContainerKind::Store, id),
            vec![CacheKey::root(RootKind::User, id)]
        );
    }
}

//! Container Mutation Engine
//!
//! Turns a logical container operation (create, partial update, delete of
//! containers or of items) into the document-store writes that perform it,
//! together with the post-condition the store's reply must satisfy. Planning
//! is pure; executing a plan and checking its result is the repository's job.
//!
//! Dispatch over container kinds is static: every plan is built from a
//! [`Container`] type whose `KIND` fixes the array field, element key and
//! owning root at compile time.

use ordelo_core::{
    allocate_containers, allocate_missing_items, Container, ContainerKind, EntityId, EntityType,
    StorageError,
};
use serde::Serialize;
use serde_json::Value;

use crate::document::{ArrayPath, ElementPath, Filter, Update, WriteModel, WriteResult};

/// Post-condition a write result must satisfy beyond acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Only acknowledgement is checked.
    Acknowledged,
    /// The filter matched a document.
    Matched,
    /// The filter matched a document and the update changed it.
    Modified,
}

/// Writes for one container operation plus how to judge their outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    operation: &'static str,
    entity_type: EntityType,
    root_id: EntityId,
    missing: (EntityType, EntityId),
    no_effect: &'static str,
    expect: Expect,
    models: Vec<WriteModel>,
}

impl MutationPlan {
    fn new(operation: &'static str, kind: ContainerKind, root_id: EntityId) -> Self {
        Self {
            operation,
            entity_type: kind.entity_type(),
            root_id,
            missing: (kind.root().entity_type(), root_id),
            no_effect: "nothing was modified",
            expect: Expect::Acknowledged,
            models: Vec::new(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn root_id(&self) -> EntityId {
        self.root_id
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    pub fn models(&self) -> &[WriteModel] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Check a store reply against this plan.
    ///
    /// An unacknowledged reply is always a `WriteConcernFailure`. A reply
    /// that matched nothing is `NotFound` for the addressed parent, and one
    /// that matched but changed nothing is `NoEffect`, where the plan
    /// requires it.
    pub fn verify(&self, result: &WriteResult) -> Result<(), StorageError> {
        if !result.acknowledged {
            return Err(StorageError::WriteConcernFailure {
                entity_type: self.entity_type,
                operation: self.operation.to_string(),
            });
        }

        if self.expect == Expect::Acknowledged {
            return Ok(());
        }

        if result.matched_count == 0 {
            let (entity_type, id) = self.missing;
            return Err(StorageError::not_found(entity_type, id));
        }

        if self.expect == Expect::Modified && result.modified_count == 0 {
            return Err(StorageError::NoEffect {
                entity_type: self.entity_type,
                root_id: self.root_id,
                reason: self.no_effect.to_string(),
            });
        }

        Ok(())
    }
}

fn encode<T: Serialize>(entity_type: EntityType, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Codec {
        entity_type,
        reason: e.to_string(),
    })
}

// ============================================================================
// CREATE
// ============================================================================

/// Allocate identifiers for `containers` and plan one push that appends the
/// whole batch to the root's array.
///
/// Returns the new container identifiers in input order. A push with at
/// least one element always modifies, so the plan demands a modification.
pub fn plan_create<C: Container>(
    root_id: EntityId,
    containers: &mut [C],
) -> Result<(Vec<EntityId>, MutationPlan), StorageError> {
    let ids = allocate_containers(containers);
    let values = containers
        .iter()
        .map(|c| encode(C::KIND.entity_type(), c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut plan = MutationPlan::new("create", C::KIND, root_id);
    plan.expect = Expect::Modified;
    plan.no_effect = "push reported no modification";
    plan.models.push(WriteModel::update_one(
        Filter::id(root_id),
        Update::Push {
            path: ArrayPath::Containers(C::KIND),
            values,
        },
    ));

    Ok((ids, plan))
}

// ============================================================================
// UPDATE
// ============================================================================

/// Plan a partial update of existing containers.
///
/// Containers without an identifier have never been persisted and are
/// skipped. For each remaining container, non-default scalar fields are set
/// on the matching element; items without an identifier are allocated one
/// (visible to the caller through `containers`) and pushed as one batch;
/// items with an identifier get their non-default fields set in place.
///
/// The resulting models form a single ordered bulk write. The plan may be
/// empty when nothing was specified.
pub fn plan_update<C: Container>(
    root_id: EntityId,
    containers: &mut [C],
) -> Result<MutationPlan, StorageError> {
    let mut plan = MutationPlan::new("update", C::KIND, root_id);

    for container in containers.iter_mut() {
        let container_id = container.id();
        if container_id.is_nil() {
            continue;
        }
        let filter = Filter::element(root_id, C::KIND, container_id);

        let patch = container.patch();
        if !patch.is_empty() {
            plan.models.push(WriteModel::update_one(
                filter.clone(),
                Update::Patch {
                    path: ElementPath::Container {
                        kind: C::KIND,
                        container: container_id,
                    },
                    patch,
                },
            ));
        }

        let fresh = allocate_missing_items(container);
        let mut new_items = Vec::with_capacity(fresh.len());
        for (index, item) in container.items().iter().enumerate() {
            if fresh.contains(&index) {
                new_items.push(encode(EntityType::Item, item)?);
                continue;
            }
            let patch = item.patch();
            if patch.is_empty() {
                continue;
            }
            plan.models.push(WriteModel::update_one(
                filter.clone(),
                Update::Patch {
                    path: ElementPath::Item {
                        kind: C::KIND,
                        container: container_id,
                        item: item.ingredient_id,
                    },
                    patch,
                },
            ));
        }

        if !new_items.is_empty() {
            plan.models.push(WriteModel::update_one(
                filter,
                Update::Push {
                    path: ArrayPath::Items {
                        kind: C::KIND,
                        container: container_id,
                    },
                    values: new_items,
                },
            ));
        }
    }

    Ok(plan)
}

// ============================================================================
// DELETE
// ============================================================================

/// Plan removal of every `kind` container of the root whose id is in `ids`.
pub fn plan_delete(kind: ContainerKind, root_id: EntityId, ids: &[EntityId]) -> MutationPlan {
    let mut plan = MutationPlan::new("delete", kind, root_id);
    plan.expect = Expect::Modified;
    plan.no_effect = "no containers were deleted, they may not exist";
    plan.models.push(WriteModel::update_one(
        Filter::id(root_id),
        Update::Pull {
            path: ArrayPath::Containers(kind),
            ids: ids.to_vec(),
        },
    ));
    plan
}

/// Plan removal of items from one container.
///
/// The filter requires the container to exist, so an absent container is
/// `NotFound` for that container while absent items are `NoEffect`.
pub fn plan_delete_items(
    kind: ContainerKind,
    root_id: EntityId,
    container: EntityId,
    ids: &[EntityId],
) -> Result<MutationPlan, StorageError> {
    kind.ensure_item_holder(kind.root())?;

    let mut plan = MutationPlan::new("delete_items", kind, root_id);
    plan.entity_type = EntityType::Item;
    plan.missing = (kind.entity_type(), container);
    plan.expect = Expect::Modified;
    plan.no_effect = "no items were deleted, they may not exist";
    plan.models.push(WriteModel::update_one(
        Filter::element(root_id, kind, container),
        Update::Pull {
            path: ArrayPath::Items { kind, container },
            ids: ids.to_vec(),
        },
    ));
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordelo_core::{Cart, Ingredient, Item, Recipe};

    fn item(name: &str, quantity: i32) -> Item {
        Item {
            name: name.to_string(),
            unit: "g".to_string(),
            unit_quantity: 100,
            price: 1.5,
            quantity,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_allocates_and_pushes_batch() {
        let root = EntityId::now_v7();
        let mut recipes = vec![
            Recipe {
                title: "Dal".to_string(),
                items: vec![item("lentils", 1), item("cumin", 2)],
                ..Default::default()
            },
            Recipe {
                title: "Rice".to_string(),
                ..Default::default()
            },
        ];

        let (ids, plan) = plan_create(root, &mut recipes).expect("plan should succeed");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], recipes[0].id);
        assert!(recipes[0].items.iter().all(|i| !i.ingredient_id.is_nil()));
        assert_eq!(plan.expect(), Expect::Modified);
        assert_eq!(plan.models().len(), 1);

        match &plan.models()[0].update {
            Update::Push { path, values } => {
                assert_eq!(*path, ArrayPath::Containers(ContainerKind::Recipe));
                assert_eq!(values.len(), 2);
                assert_eq!(values[0]["title"], "Dal");
            }
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn test_update_skips_unpersisted_containers() {
        let mut carts = vec![Cart {
            total_price: 12.0,
            ..Default::default()
        }];
        let plan = plan_update(EntityId::now_v7(), &mut carts).expect("plan should succeed");
        assert!(plan.is_empty());
        assert!(carts[0].id.is_nil());
    }

    #[test]
    fn test_update_sets_only_specified_fields() {
        let cart_id = EntityId::now_v7();
        let mut carts = vec![Cart {
            id: cart_id,
            total_price: 31.0,
            ..Default::default()
        }];
        let plan = plan_update(EntityId::now_v7(), &mut carts).expect("plan should succeed");
        assert_eq!(plan.models().len(), 1);
        match &plan.models()[0].update {
            Update::Patch { path, patch } => {
                assert_eq!(path.container(), cart_id);
                assert_eq!(patch.field_names(), vec!["total_price"]);
            }
            other => panic!("expected patch, got {:?}", other),
        }
    }

    #[test]
    fn test_update_batches_new_items_and_patches_existing() {
        let root = EntityId::now_v7();
        let recipe_id = EntityId::now_v7();
        let existing = EntityId::now_v7();
        let mut recipes = vec![Recipe {
            id: recipe_id,
            items: vec![
                Item {
                    ingredient_id: existing,
                    quantity: 5,
                    ..Default::default()
                },
                item("salt", 1),
                item("pepper", 1),
            ],
            ..Default::default()
        }];

        let plan = plan_update(root, &mut recipes).expect("plan should succeed");
        assert_eq!(plan.expect(), Expect::Acknowledged);
        assert_eq!(plan.models().len(), 2);

        match &plan.models()[0].update {
            Update::Patch {
                path: ElementPath::Item { item, .. },
                patch,
            } => {
                assert_eq!(*item, existing);
                assert_eq!(patch.field_names(), vec!["quantity"]);
            }
            other => panic!("expected item patch, got {:?}", other),
        }
        match &plan.models()[1].update {
            Update::Push { path, values } => {
                assert_eq!(
                    *path,
                    ArrayPath::Items {
                        kind: ContainerKind::Recipe,
                        container: recipe_id
                    }
                );
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected item push, got {:?}", other),
        }
        assert!(recipes[0].items.iter().all(|i| !i.ingredient_id.is_nil()));
        assert_eq!(recipes[0].items[0].ingredient_id, existing);
    }

    #[test]
    fn test_verify_distinguishes_outcomes() {
        let root = EntityId::now_v7();
        let plan = plan_delete(ContainerKind::Cart, root, &[EntityId::now_v7()]);

        let unacknowledged = WriteResult::default();
        assert!(matches!(
            plan.verify(&unacknowledged),
            Err(StorageError::WriteConcernFailure { .. })
        ));

        let missing_root = WriteResult::acknowledged();
        assert_eq!(
            plan.verify(&missing_root),
            Err(StorageError::not_found(EntityType::User, root))
        );

        let untouched = WriteResult {
            matched_count: 1,
            ..WriteResult::acknowledged()
        };
        assert!(matches!(
            plan.verify(&untouched),
            Err(StorageError::NoEffect { entity_type: EntityType::Cart, .. })
        ));

        let done = WriteResult {
            matched_count: 1,
            modified_count: 1,
            ..WriteResult::acknowledged()
        };
        assert!(plan.verify(&done).is_ok());
    }

    #[test]
    fn test_delete_items_reports_missing_container() {
        let root = EntityId::now_v7();
        let container = EntityId::now_v7();
        let plan = plan_delete_items(ContainerKind::Store, root, container, &[EntityId::now_v7()])
            .expect("stores hold items");
        assert_eq!(
            plan.verify(&WriteResult::acknowledged()),
            Err(StorageError::not_found(EntityType::Store, container))
        );
    }

    #[test]
    fn test_delete_items_rejects_itemless_kind() {
        let err = plan_delete_items(
            ContainerKind::Ingredient,
            EntityId::now_v7(),
            EntityId::now_v7(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::UnknownContainerKind { .. }));
    }

    #[test]
    fn test_ingredient_update_patches_catalog_entry() {
        let id = EntityId::now_v7();
        let mut ingredients = vec![Ingredient {
            ingredient_id: id,
            price: 3.2,
            ..Default::default()
        }];
        let plan = plan_update(EntityId::now_v7(), &mut ingredients).expect("plan should succeed");
        assert_eq!(plan.models().len(), 1);
        assert_eq!(
            plan.models()[0].filter,
            Filter::element(plan.root_id(), ContainerKind::Ingredient, id)
        );
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use ordelo_core::{Item, Recipe};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn arb_recipes() -> impl Strategy<Value = Vec<Recipe>> {
        prop::collection::vec(0usize..6, 1..8).prop_map(|item_counts| {
            item_counts
                .into_iter()
                .map(|count| Recipe {
                    title: "generated".to_string(),
                    items: vec![Item::default(); count],
                    ..Default::default()
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_create_ids_are_distinct_and_set(mut recipes in arb_recipes()) {
            let (ids, plan) = plan_create(EntityId::now_v7(), &mut recipes)
                .expect("plan should succeed");

            prop_assert_eq!(ids.len(), recipes.len());
            prop_assert!(ids.iter().all(|id| !id.is_nil()));
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());

            for recipe in &recipes {
                let items: HashSet<_> = recipe.items.iter().map(|i| i.ingredient_id).collect();
                prop_assert_eq!(items.len(), recipe.items.len());
                prop_assert!(!items.contains(&EntityId::nil()));
            }
            prop_assert_eq!(plan.models().len(), 1);
        }

        #[test]
        fn prop_update_never_pushes_nil_items(mut recipes in arb_recipes()) {
            for recipe in recipes.iter_mut() {
                recipe.id = EntityId::now_v7();
            }
            let plan = plan_update(EntityId::now_v7(), &mut recipes)
                .expect("plan should succeed");

            for model in plan.models() {
                if let Update::Push { values, .. } = &model.update {
                    for value in values {
                        prop_assert_ne!(
                            value["ingredient_id"].as_str(),
                            Some("00000000-0000-0000-0000-000000000000")
                        );
                    }
                }
            }
        }
    }
}

//! Property-based tests for container mutations through the cached user
//! repository.
//!
//! For any batch of new containers:
//! - create assigns distinct identifiers to every container and item
//! - a subsequent find returns exactly what was created, in order
//! - deleting every created container leaves the array empty

use ordelo_core::{Cart, EntityId, Recipe};
use ordelo_storage::UserRepository;
use ordelo_test_utils::assertions::assert_ids_assigned;
use ordelo_test_utils::fixtures::{self, backends, generous_deadline, user_repository};
use ordelo_test_utils::generators::{arb_cart, arb_recipe};
use proptest::collection::vec;
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn item_ids<'a>(items: impl Iterator<Item = &'a ordelo_core::Item>) -> Vec<EntityId> {
    items.map(|item| item.ingredient_id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_created_recipes_round_trip(recipes in vec(arb_recipe(), 1..5)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, cache) = backends();
            let users = user_repository(&store, &cache);
            let deadline = generous_deadline();

            let mut user = fixtures::test_user();
            let user_id = users
                .create_user(deadline, &mut user)
                .await
                .map_err(|e| TestCaseError::fail(format!("create user failed: {}", e)))?;

            let mut batch: Vec<Recipe> = recipes.clone();
            let ids = users
                .create_recipes(deadline, user_id, &mut batch)
                .await
                .map_err(|e| TestCaseError::fail(format!("create recipes failed: {}", e)))?;
            prop_assert_eq!(ids.len(), recipes.len());
            assert_ids_assigned(&ids);
            assert_ids_assigned(&item_ids(batch.iter().flat_map(|r| r.items.iter())));

            let found = users
                .find_recipes(deadline, user_id)
                .await
                .map_err(|e| TestCaseError::fail(format!("find recipes failed: {}", e)))?;
            prop_assert_eq!(&found, &batch);

            users
                .delete_recipes(deadline, user_id, &ids)
                .await
                .map_err(|e| TestCaseError::fail(format!("delete recipes failed: {}", e)))?;
            let remaining = users
                .find_recipes(deadline, user_id)
                .await
                .map_err(|e| TestCaseError::fail(format!("find recipes failed: {}", e)))?;
            prop_assert!(remaining.is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_total_price_update_preserves_cart(
        cart in arb_cart(),
        price in 1u32..10_000,
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, cache) = backends();
            let users = user_repository(&store, &cache);
            let deadline = generous_deadline();

            let mut user = fixtures::test_user();
            let user_id = users
                .create_user(deadline, &mut user)
                .await
                .map_err(|e| TestCaseError::fail(format!("create user failed: {}", e)))?;
            let mut carts = vec![cart];
            let ids = users
                .create_carts(deadline, user_id, &mut carts)
                .await
                .map_err(|e| TestCaseError::fail(format!("create carts failed: {}", e)))?;

            let total_price = f64::from(price) / 100.0;
            let mut update = vec![Cart {
                id: ids[0],
                total_price,
                ..Default::default()
            }];
            users
                .update_carts(deadline, user_id, &mut update)
                .await
                .map_err(|e| TestCaseError::fail(format!("update carts failed: {}", e)))?;

            let found = users
                .find_carts(deadline, user_id)
                .await
                .map_err(|e| TestCaseError::fail(format!("find carts failed: {}", e)))?;
            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(found[0].total_price, total_price);
            prop_assert_eq!(found[0].vendor_id, carts[0].vendor_id);
            prop_assert_eq!(&found[0].items, &carts[0].items);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

//! Ingredient matching across vendor stores.

use ordelo_core::{IngredientRequirement, Item, Store, Vendor, VendorMatch};

/// Best item in `items` for one requirement.
///
/// Candidates share the requirement's name and unit and hold at least the
/// requested unit quantity. The smallest surplus wins; ties go to the item
/// seen first.
pub fn best_item<'a>(items: &'a [Item], requirement: &IngredientRequirement) -> Option<&'a Item> {
    items
        .iter()
        .filter(|item| {
            item.name == requirement.name
                && item.unit == requirement.unit
                && item.unit_quantity >= requirement.unit_quantity
        })
        .fold(None, |best: Option<&Item>, item| match best {
            Some(current) if current.unit_quantity <= item.unit_quantity => Some(current),
            _ => Some(item),
        })
}

/// `store` reduced to its best item per requirement, or `None` when no
/// requirement matched.
pub fn match_store_items(store: &Store, requirements: &[IngredientRequirement]) -> Option<Store> {
    let items: Vec<Item> = requirements
        .iter()
        .filter_map(|requirement| best_item(&store.items, requirement))
        .cloned()
        .collect();

    if items.is_empty() {
        return None;
    }
    Some(Store {
        items,
        ..store.clone()
    })
}

/// Stores of `vendor` that matched at least one requirement.
pub fn match_vendor(
    vendor: &Vendor,
    requirements: &[IngredientRequirement],
) -> Option<VendorMatch> {
    let stores: Vec<Store> = vendor
        .stores
        .iter()
        .filter_map(|store| match_store_items(store, requirements))
        .collect();

    if stores.is_empty() {
        return None;
    }
    Some(VendorMatch {
        vendor_id: vendor.profile.id,
        stores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordelo_core::EntityId;

    fn stocked(name: &str, unit_quantity: i32, unit: &str) -> Item {
        Item {
            ingredient_id: EntityId::now_v7(),
            name: name.to_string(),
            unit_quantity,
            unit: unit.to_string(),
            price: 2.0,
            quantity: 10,
        }
    }

    fn need(name: &str, unit_quantity: i32, unit: &str) -> IngredientRequirement {
        IngredientRequirement {
            name: name.to_string(),
            unit_quantity,
            unit: unit.to_string(),
        }
    }

    #[test]
    fn test_best_item_prefers_smallest_surplus() {
        let items = vec![
            stocked("rice", 1000, "g"),
            stocked("rice", 500, "g"),
            stocked("rice", 250, "g"),
        ];
        let best = best_item(&items, &need("rice", 400, "g")).expect("should match");
        assert_eq!(best.unit_quantity, 500);
    }

    #[test]
    fn test_best_item_first_seen_wins_ties() {
        let items = vec![stocked("milk", 1, "l"), stocked("milk", 1, "l")];
        let best = best_item(&items, &need("milk", 1, "l")).expect("should match");
        assert_eq!(best.ingredient_id, items[0].ingredient_id);
    }

    #[test]
    fn test_best_item_requires_same_unit() {
        let items = vec![stocked("milk", 1000, "ml")];
        assert!(best_item(&items, &need("milk", 1, "l")).is_none());
    }

    #[test]
    fn test_vendor_without_matching_store_is_dropped() {
        let vendor = Vendor {
            stores: vec![Store {
                items: vec![stocked("salt", 100, "g")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(match_vendor(&vendor, &[need("sugar", 100, "g")]).is_none());
    }

    #[test]
    fn test_matching_store_keeps_only_best_items() {
        let store = Store {
            id: EntityId::now_v7(),
            name: "Corner".to_string(),
            items: vec![
                stocked("salt", 100, "g"),
                stocked("flour", 1000, "g"),
                stocked("flour", 2000, "g"),
            ],
            ..Default::default()
        };
        let matched = match_store_items(&store, &[need("flour", 900, "g"), need("yeast", 7, "g")])
            .expect("flour should match");
        assert_eq!(matched.id, store.id);
        assert_eq!(matched.name, "Corner");
        assert_eq!(matched.items.len(), 1);
        assert_eq!(matched.items[0].unit_quantity, 1000);
    }
}

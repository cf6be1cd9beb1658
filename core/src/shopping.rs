use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::models::{ShoppingItem, WeeklyPlan};

/// Aggregate the ingredients of every planned meal into one list.
///
/// Ingredients are grouped by their trimmed, lowercased text. A recipe
/// planned twice counts twice but is listed once.
pub fn build_shopping_list(plan: &WeeklyPlan, catalog: &Catalog) -> Vec<ShoppingItem> {
    let mut items: BTreeMap<String, ShoppingItem> = BTreeMap::new();

    for recipe in plan.recipe_ids().filter_map(|id| catalog.get(id)) {
        for ingredient in &recipe.ingredients {
            let key = ingredient.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let item = items.entry(key.clone()).or_insert_with(|| ShoppingItem {
                ingredient: key,
                count: 0,
                recipes: Vec::new(),
            });
            item.count += 1;
            if !item.recipes.contains(&recipe.name) {
                item.recipes.push(recipe.name.clone());
            }
        }
    }

    items.into_values().collect()
}

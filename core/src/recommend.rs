//! Recipe recommendations: the diet filter plus allergy and kitchen tool checks.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::filter::filter_recipes;
use crate::models::{Recipe, UserPreferences};

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

/// Tool name and the step or ingredient wording that implies it.
const TOOL_CUES: &[(&str, &[&str])] = &[
    ("oven", &["oven", "bake", "roast"]),
    ("air-fryer", &["air-fryer", "air fryer", "air fry"]),
    ("instant-pot", &["instant pot", "pressure cook"]),
    ("grill", &["grill"]),
    ("blender", &["blend", "puree"]),
    ("food-processor", &["food processor"]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub required_tools: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub matches: Vec<Recommendation>,
    pub total_matches: usize,
}

fn tool_key(tool: &str) -> String {
    tool.trim().to_lowercase().replace(' ', "-")
}

/// Tools a recipe's steps and ingredients call for, in [`TOOL_CUES`] order.
pub fn required_tools(recipe: &Recipe) -> Vec<&'static str> {
    let text = recipe
        .steps
        .iter()
        .chain(&recipe.ingredients)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    TOOL_CUES
        .iter()
        .filter(|(_, cues)| cues.iter().any(|cue| text.contains(cue)))
        .map(|(tool, _)| *tool)
        .collect()
}

/// An empty tool list means the kitchen is not restricted.
pub fn has_tools(required: &[&str], available: &[String]) -> bool {
    if available.is_empty() {
        return true;
    }
    let available: Vec<String> = available.iter().map(|t| tool_key(t)).collect();
    required.iter().all(|tool| available.contains(&tool_key(tool)))
}

/// Substring match of each allergy against the recipe name and ingredients.
pub fn contains_allergen(recipe: &Recipe, allergies: &[String]) -> bool {
    let text = format!("{} {}", recipe.name, recipe.ingredients.join(" ")).to_lowercase();
    allergies
        .iter()
        .map(|a| a.trim().to_lowercase())
        .any(|a| !a.is_empty() && text.contains(&a))
}

/// Catalog recipes fitting every preference, fewest tools first, then quickest.
/// Ties keep catalog order.
pub fn recommend(
    catalog: &Catalog,
    preferences: &UserPreferences,
    limit: usize,
) -> Recommendations {
    let pool = filter_recipes(catalog.all(), &preferences.restrictions);
    let mut matches: Vec<Recommendation> = pool
        .into_iter()
        .filter(|recipe| !contains_allergen(recipe, &preferences.allergies))
        .filter_map(|recipe| {
            let tools = required_tools(recipe);
            has_tools(&tools, &preferences.tools).then(|| Recommendation {
                recipe: recipe.clone(),
                required_tools: tools,
            })
        })
        .collect();

    matches.sort_by_key(|m| (m.required_tools.len(), m.recipe.time));
    let total_matches = matches.len();
    matches.truncate(limit);

    tracing::debug!(total_matches, limit, "recommendations ranked");
    Recommendations {
        matches,
        total_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64, time: u32, ingredients: &[&str], steps: &[&str]) -> Recipe {
        Recipe {
            id,
            name: format!("Recipe {id}"),
            time,
            servings: 1,
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            sugar: 0.0,
            cholesterol: 0.0,
            fiber: 0.0,
            tags: vec!["vegan".to_string()],
            ingredients: ingredients.iter().map(ToString::to_string).collect(),
            steps: steps.iter().map(ToString::to_string).collect(),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn ids(recs: &Recommendations) -> Vec<i64> {
        recs.matches.iter().map(|m| m.recipe.id).collect()
    }

    #[test]
    fn test_required_tools_from_steps() {
        let r = recipe(1, 10, &["potatoes"], &["Roast the potatoes.", "Blend the sauce."]);
        assert_eq!(required_tools(&r), vec!["oven", "blender"]);

        let plain = recipe(2, 10, &["bread"], &["Slice and serve."]);
        assert!(required_tools(&plain).is_empty());
    }

    #[test]
    fn test_has_tools_normalizes_names() {
        assert!(has_tools(&["air-fryer"], &strings(&["Air Fryer"])));
        assert!(!has_tools(&["oven"], &strings(&["grill"])));
        assert!(has_tools(&["oven"], &[]));
        assert!(has_tools(&[], &strings(&["grill"])));
    }

    #[test]
    fn test_allergens_match_name_and_ingredients() {
        let r = recipe(1, 10, &["2 tbsp Peanut butter"], &[]);
        assert!(contains_allergen(&r, &strings(&["peanut"])));
        assert!(contains_allergen(&r, &strings(&["recipe 1"])));
        assert!(!contains_allergen(&r, &strings(&["shellfish", " "])));
    }

    #[test]
    fn test_ranking_and_limit() {
        let catalog = Catalog::from_recipes(vec![
            recipe(1, 40, &["beans"], &["Bake for 30 minutes."]),
            recipe(2, 30, &["rice"], &["Simmer."]),
            recipe(3, 10, &["toast"], &["Toast."]),
            recipe(4, 30, &["lentils"], &["Stir."]),
        ])
        .unwrap();

        let all = recommend(&catalog, &UserPreferences::default(), MAX_LIMIT);
        assert_eq!(ids(&all), vec![3, 2, 4, 1]);
        assert_eq!(all.total_matches, 4);

        let top = recommend(&catalog, &UserPreferences::default(), 2);
        assert_eq!(ids(&top), vec![3, 2]);
        assert_eq!(top.total_matches, 4);
    }

    #[test]
    fn test_bundled_catalog_respects_every_preference() {
        let catalog = Catalog::bundled().unwrap();
        let prefs = UserPreferences {
            restrictions: strings(&["vegan"]),
            allergies: strings(&["tofu"]),
            tools: strings(&["stovetop"]),
        };

        let recs = recommend(&catalog, &prefs, 3);
        assert_eq!(recs.total_matches, 5);
        assert_eq!(ids(&recs), vec![24, 1, 7]);
        for m in &recs.matches {
            assert!(crate::filter::is_vegan(&m.recipe));
            assert!(m.required_tools.is_empty());
            assert!(!m.recipe.ingredient_text().contains("tofu"));
        }
    }
}

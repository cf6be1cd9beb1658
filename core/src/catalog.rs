use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::models::Recipe;

const BUNDLED_RECIPES: &str = include_str!("../data/recipes.json");

/// The immutable recipe catalog every plan is drawn from.
#[derive(Debug, Clone)]
pub struct Catalog {
    recipes: Vec<Recipe>,
    index: HashMap<i64, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub search_score: u32,
}

impl Catalog {
    pub fn from_recipes(recipes: Vec<Recipe>) -> Result<Self> {
        let mut index = HashMap::with_capacity(recipes.len());
        for (pos, recipe) in recipes.iter().enumerate() {
            if index.insert(recipe.id, pos).is_some() {
                bail!("Duplicate recipe id {} ('{}')", recipe.id, recipe.name);
            }
        }
        Ok(Self { recipes, index })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let recipes: Vec<Recipe> =
            serde_json::from_str(json).context("Recipe catalog is not a JSON array of recipes")?;
        Self::from_recipes(recipes)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe catalog: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid recipe catalog: {}", path.display()))
    }

    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_RECIPES)
    }

    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn get(&self, id: i64) -> Option<&Recipe> {
        self.index.get(&id).map(|&pos| &self.recipes[pos])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Case-insensitive text search over name, tags and ingredients.
    ///
    /// A name hit scores 10, a tag hit 5 and an ingredient hit 3. Results are
    /// ordered by score, ties keep catalog order.
    pub fn search(&self, query: &str) -> Result<Vec<ScoredRecipe>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            bail!("Search query is required");
        }

        let mut hits: Vec<ScoredRecipe> = self
            .recipes
            .iter()
            .filter_map(|recipe| {
                let mut score = 0;
                if recipe.name.to_lowercase().contains(&query) {
                    score += 10;
                }
                if recipe.tags.join(" ").to_lowercase().contains(&query) {
                    score += 5;
                }
                if recipe.ingredient_text().contains(&query) {
                    score += 3;
                }
                (score > 0).then(|| ScoredRecipe {
                    recipe: recipe.clone(),
                    search_score: score,
                })
            })
            .collect();

        // sort_by is stable, so equal scores stay in catalog order
        hits.sort_by(|a, b| b.search_score.cmp(&a.search_score));
        Ok(hits)
    }
}

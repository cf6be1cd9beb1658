//! Dietary filtering of the recipe catalog.
//!
//! Tags in the catalog are not fully trustworthy, so a recipe must both carry
//! the right diet tag and pass a keyword scan of its ingredient text.

use crate::models::Recipe;

/// Ingredient keywords that disqualify a recipe from being vegetarian.
pub const MEAT_KEYWORDS: &[&str] = &[
    "meat",
    "beef",
    "steak",
    "veal",
    "pork",
    "bacon",
    "ham",
    "prosciutto",
    "pancetta",
    "sausage",
    "chorizo",
    "pepperoni",
    "salami",
    "chicken",
    "turkey",
    "duck",
    "lamb",
    "mutton",
    "venison",
    "fish",
    "salmon",
    "tuna",
    "cod",
    "anchovy",
    "anchovies",
    "sardine",
    "shrimp",
    "prawn",
    "crab",
    "lobster",
    "scallop",
    "gelatin",
];

/// Keywords that disqualify a recipe from being vegan, on top of [`MEAT_KEYWORDS`].
pub const NON_VEGAN_KEYWORDS: &[&str] = &[
    "milk",
    "cheese",
    "butter",
    "cream",
    "yogurt",
    "yoghurt",
    "egg",
    "honey",
    "mayonnaise",
    "whey",
    "ghee",
    "parmesan",
    "mozzarella",
    "ricotta",
    "feta",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    Vegetarian,
    Vegan,
}

impl Restriction {
    /// Only vegetarian and vegan restrict anything; every other value is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("vegetarian") {
            Some(Self::Vegetarian)
        } else if value.eq_ignore_ascii_case("vegan") {
            Some(Self::Vegan)
        } else {
            None
        }
    }

    pub fn allows(self, recipe: &Recipe) -> bool {
        match self {
            Self::Vegetarian => is_vegetarian(recipe),
            Self::Vegan => is_vegan(recipe),
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

pub fn is_vegetarian(recipe: &Recipe) -> bool {
    (recipe.has_tag("vegetarian") || recipe.has_tag("vegan"))
        && !contains_any(&recipe.ingredient_text(), MEAT_KEYWORDS)
}

pub fn is_vegan(recipe: &Recipe) -> bool {
    let text = recipe.ingredient_text();
    recipe.has_tag("vegan")
        && !contains_any(&text, MEAT_KEYWORDS)
        && !contains_any(&text, NON_VEGAN_KEYWORDS)
}

/// Narrow `pool` to recipes satisfying every recognised restriction.
///
/// With no recognised restriction the pool comes back unchanged, in order.
pub fn filter_recipes<'a, I>(pool: I, restrictions: &[String]) -> Vec<&'a Recipe>
where
    I: IntoIterator<Item = &'a Recipe>,
{
    let active: Vec<Restriction> = restrictions
        .iter()
        .filter_map(|r| Restriction::parse(r))
        .collect();

    pool.into_iter()
        .filter(|recipe| active.iter().all(|r| r.allows(recipe)))
        .collect()
}

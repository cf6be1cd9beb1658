use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    /// Total preparation time in minutes.
    #[serde(default)]
    pub time: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub cholesterol: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

fn default_servings() -> u32 {
    1
}

impl Recipe {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.trim().eq_ignore_ascii_case(tag))
    }

    /// All ingredients joined into one lowercased string, for keyword scans.
    pub fn ingredient_text(&self) -> String {
        self.ingredients.join(" ").to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Day::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid day '{s}'. Must be one of: {}",
                    Day::ALL.map(Day::name).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        MealType::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid meal type '{s}'. Must be one of: {}",
                    MealType::ALL.map(MealType::as_str).join(", ")
                )
            })
    }
}

/// Day name -> meal type -> recipe id.
///
/// Days and meals serialize in calendar and meal order because both maps are
/// keyed by ordered enums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyPlan(BTreeMap<Day, BTreeMap<MealType, i64>>);

impl WeeklyPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: Day, meal: MealType) -> Option<i64> {
        self.0.get(&day).and_then(|meals| meals.get(&meal)).copied()
    }

    pub fn day(&self, day: Day) -> Option<&BTreeMap<MealType, i64>> {
        self.0.get(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = (Day, &BTreeMap<MealType, i64>)> {
        self.0.iter().map(|(day, meals)| (*day, meals))
    }

    /// Insert an empty day if it is not present yet.
    pub fn ensure_day(&mut self, day: Day) {
        self.0.entry(day).or_default();
    }

    /// Insert or replace a single slot. Returns the previous recipe id.
    pub fn set_slot(&mut self, day: Day, meal: MealType, recipe_id: i64) -> Option<i64> {
        self.0.entry(day).or_default().insert(meal, recipe_id)
    }

    /// Remove a single slot, dropping the day entirely once it has no meals left.
    pub fn remove_slot(&mut self, day: Day, meal: MealType) -> bool {
        let Some(meals) = self.0.get_mut(&day) else {
            return false;
        };
        let removed = meals.remove(&meal).is_some();
        if meals.is_empty() {
            self.0.remove(&day);
        }
        removed
    }

    pub fn day_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every planned recipe id in day then meal order, repeats included.
    pub fn recipe_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.values().flat_map(|meals| meals.values().copied())
    }
}

/// Preferences that steer plan generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, alias = "dietaryRestrictions", alias = "dietary_restrictions")]
    pub restrictions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, alias = "kitchenTools", alias = "kitchen_tools")]
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPrefs {
    pub user_id: i64,
    pub restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub tools: Vec<String>,
}

impl DietaryPrefs {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn as_preferences(&self) -> UserPreferences {
        UserPreferences {
            restrictions: self.restrictions.clone(),
            allergies: self.allergies.clone(),
            tools: self.tools.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    pub user_id: i64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub cholesterol: f64,
}

impl Goals {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub user_id: i64,
    pub points: i64,
    pub cart_items: i64,
    pub cart_contents: Vec<serde_json::Value>,
}

impl Stats {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub favorite_recipes: Vec<i64>,
    pub created_at: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionTotals {
    pub fn add(&mut self, recipe: &Recipe) {
        self.calories += recipe.calories;
        self.protein += recipe.protein;
        self.carbs += recipe.carbs;
        self.fat += recipe.fat;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub ingredient: String,
    /// Number of planned meals using this ingredient.
    pub count: usize,
    pub recipes: Vec<String>,
}

pub fn validate_goals(goals: &Goals) -> Result<()> {
    let fields = [
        ("calories", goals.calories),
        ("protein", goals.protein),
        ("carbs", goals.carbs),
        ("fat", goals.fat),
        ("fiber", goals.fiber),
        ("sugar", goals.sugar),
        ("cholesterol", goals.cholesterol),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            bail!("{name} must be a non-negative number");
        }
    }
    Ok(())
}

pub fn validate_stats(stats: &Stats) -> Result<()> {
    if stats.points < 0 {
        bail!("points must not be negative");
    }
    if stats.cart_items < 0 {
        bail!("cartItems must not be negative");
    }
    Ok(())
}

/// Minimal shape check: something before and after a single `@`.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => bail!("Invalid email address '{email}'"),
    }
}

/// Trim entries and drop blanks and case-insensitive duplicates, keeping order.
pub fn normalize_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() || out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            continue;
        }
        out.push(value.to_string());
    }
    out
}

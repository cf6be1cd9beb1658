use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::filter::filter_recipes;
use crate::models::{Day, MealType, NutritionTotals, Recipe, UserPreferences, WeeklyPlan};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("No recipes match the selected dietary preferences")]
    EmptyPool,
}

/// Fill every (day, meal type) slot with a uniformly random recipe.
///
/// Recipes tagged with the slot's meal type are preferred; when none exist the
/// whole pool is used instead.
pub fn generate_weekly_plan<R>(pool: &[&Recipe], rng: &mut R) -> Result<WeeklyPlan, PlanError>
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(PlanError::EmptyPool);
    }

    let by_meal: Vec<(MealType, Vec<&Recipe>)> = MealType::ALL
        .into_iter()
        .map(|meal| {
            let tagged = pool
                .iter()
                .copied()
                .filter(|r| r.has_tag(meal.as_str()))
                .collect();
            (meal, tagged)
        })
        .collect();

    let mut plan = WeeklyPlan::new();
    for day in Day::ALL {
        plan.ensure_day(day);
        for (meal, tagged) in &by_meal {
            let candidates = if tagged.is_empty() {
                pool
            } else {
                tagged.as_slice()
            };
            let recipe = candidates.choose(rng).ok_or(PlanError::EmptyPool)?;
            plan.set_slot(day, *meal, recipe.id);
        }
    }
    Ok(plan)
}

/// Filter the catalog by the preferences' restrictions, then generate a week.
pub fn plan_for_preferences<R>(
    catalog: &Catalog,
    preferences: &UserPreferences,
    rng: &mut R,
) -> Result<WeeklyPlan, PlanError>
where
    R: Rng + ?Sized,
{
    let pool = filter_recipes(catalog.all(), &preferences.restrictions);
    tracing::debug!(
        pool = pool.len(),
        catalog = catalog.len(),
        restrictions = ?preferences.restrictions,
        "filtered recipe pool"
    );
    generate_weekly_plan(&pool, rng)
}

/// Per-day calorie and macro totals. Ids missing from the catalog are skipped.
pub fn daily_nutrition(plan: &WeeklyPlan, catalog: &Catalog) -> BTreeMap<Day, NutritionTotals> {
    plan.days()
        .map(|(day, meals)| {
            let mut totals = NutritionTotals::default();
            for recipe in meals.values().filter_map(|id| catalog.get(*id)) {
                totals.add(recipe);
            }
            (day, totals)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn recipe(id: i64, tags: &[&str]) -> Recipe {
        Recipe {
            id,
            name: format!("Recipe {id}"),
            time: 0,
            servings: 1,
            calories: 100.0 * id as f64,
            protein: 10.0,
            carbs: 20.0,
            fat: 5.0,
            sugar: 0.0,
            cholesterol: 0.0,
            fiber: 0.0,
            tags: tags.iter().map(ToString::to_string).collect(),
            ingredients: vec!["water".to_string()],
            steps: vec![],
        }
    }

    #[test]
    fn test_plan_has_every_day_and_meal() {
        let catalog = Catalog::bundled().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for restrictions in [vec![], vec!["vegetarian".to_string()], vec!["vegan".to_string()]] {
            let prefs = UserPreferences {
                restrictions,
                ..UserPreferences::default()
            };
            let plan = plan_for_preferences(&catalog, &prefs, &mut rng).unwrap();
            assert_eq!(plan.day_count(), 7);
            for (day, meals) in plan.days() {
                assert!(meals.len() <= 3, "{day} has {} meals", meals.len());
                for id in meals.values() {
                    assert!(catalog.contains(*id));
                }
            }
            let days: Vec<Day> = plan.days().map(|(d, _)| d).collect();
            assert_eq!(days, Day::ALL.to_vec());
        }
    }

    #[test]
    fn test_slots_use_meal_tagged_recipes() {
        let pool_owned = vec![
            recipe(1, &["breakfast"]),
            recipe(2, &["lunch"]),
            recipe(3, &["dinner"]),
        ];
        let pool: Vec<&Recipe> = pool_owned.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let plan = generate_weekly_plan(&pool, &mut rng).unwrap();
        for day in Day::ALL {
            assert_eq!(plan.get(day, MealType::Breakfast), Some(1));
            assert_eq!(plan.get(day, MealType::Lunch), Some(2));
            assert_eq!(plan.get(day, MealType::Dinner), Some(3));
        }
    }

    #[test]
    fn test_missing_meal_type_falls_back_to_whole_pool() {
        let pool_owned = vec![recipe(1, &["dinner"]), recipe(2, &["dinner"])];
        let pool: Vec<&Recipe> = pool_owned.iter().collect();
        let mut rng = StdRng::seed_from_u64(99);

        let plan = generate_weekly_plan(&pool, &mut rng).unwrap();
        for day in Day::ALL {
            let breakfast = plan.get(day, MealType::Breakfast).unwrap();
            assert!(breakfast == 1 || breakfast == 2);
        }
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generate_weekly_plan(&[], &mut rng), Err(PlanError::EmptyPool));
    }

    #[test]
    fn test_restrictions_that_match_nothing() {
        let catalog = Catalog::from_recipes(vec![recipe(1, &["dinner"])]).unwrap();
        let prefs = UserPreferences {
            restrictions: vec!["vegan".to_string()],
            ..UserPreferences::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            plan_for_preferences(&catalog, &prefs, &mut rng),
            Err(PlanError::EmptyPool)
        );
    }

    #[test]
    fn test_same_seed_same_plan() {
        let catalog = Catalog::bundled().unwrap();
        let prefs = UserPreferences::default();
        let a = plan_for_preferences(&catalog, &prefs, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = plan_for_preferences(&catalog, &prefs, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_daily_nutrition_skips_unknown_ids() {
        let catalog = Catalog::from_recipes(vec![recipe(1, &[]), recipe(2, &[])]).unwrap();
        let mut plan = WeeklyPlan::new();
        plan.set_slot(Day::Monday, MealType::Breakfast, 1);
        plan.set_slot(Day::Monday, MealType::Lunch, 2);
        plan.set_slot(Day::Monday, MealType::Dinner, 404);
        plan.set_slot(Day::Tuesday, MealType::Dinner, 2);

        let totals = daily_nutrition(&plan, &catalog);
        assert_eq!(totals.len(), 2);
        let monday = &totals[&Day::Monday];
        assert!((monday.calories - 300.0).abs() < f64::EPSILON);
        assert!((monday.protein - 20.0).abs() < f64::EPSILON);
        assert!((totals[&Day::Tuesday].calories - 200.0).abs() < f64::EPSILON);
    }
}

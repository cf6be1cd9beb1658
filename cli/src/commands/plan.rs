use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use mealplan_core::catalog::Catalog;
use mealplan_core::db::Database;
use mealplan_core::models::{UserPreferences, WeeklyPlan};
use mealplan_core::planner::plan_for_preferences;
use mealplan_core::preferences::resolve_preferences;

use super::helpers::print_plan_table;

/// Generate a week without storing it. `user` pulls that account's saved
/// dietary preferences in underneath the command-line restrictions.
pub(crate) fn cmd_plan(
    db: &Database,
    catalog: &Catalog,
    restrictions: Vec<String>,
    user: Option<&str>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let stored = match user {
        Some(email) => {
            let user = db
                .get_user_by_email(email)?
                .with_context(|| format!("No user with email '{email}'"))?;
            db.get_dietary_prefs(user.id)?
        }
        None => None,
    };
    let requested = UserPreferences {
        restrictions,
        ..UserPreferences::default()
    };
    let preferences = resolve_preferences(Some(&requested), stored.as_ref());

    let plan = generate(catalog, &preferences, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        if !preferences.restrictions.is_empty() {
            println!("Restrictions: {}", preferences.restrictions.join(", "));
        }
        print_plan_table(&plan, catalog);
    }

    Ok(())
}

fn generate(
    catalog: &Catalog,
    preferences: &UserPreferences,
    seed: Option<u64>,
) -> Result<WeeklyPlan> {
    let plan = match seed {
        Some(seed) => plan_for_preferences(catalog, preferences, &mut StdRng::seed_from_u64(seed)),
        None => plan_for_preferences(catalog, preferences, &mut rand::rng()),
    }?;
    Ok(plan)
}

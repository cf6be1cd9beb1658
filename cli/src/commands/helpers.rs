use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::catalog::{Catalog, ScoredRecipe};
use mealplan_core::db::TableStatus;
use mealplan_core::models::{MealType, Recipe, WeeklyPlan};
use mealplan_core::planner::daily_nutrition;

pub(crate) fn print_recipe_table(recipes: &[&Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Min")]
        time: u32,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 35),
            time: r.time,
            calories: format!("{:.0}", r.calories),
            tags: truncate(&r.tags.join(", "), 40),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_search_table(results: &[ScoredRecipe]) {
    #[derive(Tabled)]
    struct SearchRow {
        #[tabled(rename = "Score")]
        score: u32,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<SearchRow> = results
        .iter()
        .map(|hit| SearchRow {
            score: hit.search_score,
            id: hit.recipe.id,
            name: truncate(&hit.recipe.name, 35),
            tags: truncate(&hit.recipe.tags.join(", "), 40),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_plan_table(plan: &WeeklyPlan, catalog: &Catalog) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Breakfast")]
        breakfast: String,
        #[tabled(rename = "Lunch")]
        lunch: String,
        #[tabled(rename = "Dinner")]
        dinner: String,
        #[tabled(rename = "Cal")]
        calories: String,
    }

    let totals = daily_nutrition(plan, catalog);
    let slot = |meals: &std::collections::BTreeMap<MealType, i64>, meal: MealType| {
        meals.get(&meal).map_or_else(
            || "-".to_string(),
            |id| {
                catalog
                    .get(*id)
                    .map_or_else(|| format!("#{id}"), |r| truncate(&r.name, 28))
            },
        )
    };

    let rows: Vec<PlanRow> = plan
        .days()
        .map(|(day, meals)| PlanRow {
            day: day.to_string(),
            breakfast: slot(meals, MealType::Breakfast),
            lunch: slot(meals, MealType::Lunch),
            dinner: slot(meals, MealType::Dinner),
            calories: totals
                .get(&day)
                .map_or_else(|| "-".to_string(), |t| format!("{:.0}", t.calories)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_table_status(status: &[TableStatus]) {
    #[derive(Tabled)]
    struct StatusRow {
        #[tabled(rename = "Table")]
        table: String,
        #[tabled(rename = "Exists")]
        exists: &'static str,
        #[tabled(rename = "Rows")]
        rows: String,
    }

    let rows: Vec<StatusRow> = status
        .iter()
        .map(|s| StatusRow {
            table: s.table.clone(),
            exists: if s.exists { "yes" } else { "no" },
            rows: s.rows.map_or_else(|| "-".to_string(), |n| n.to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée pots", 10), "Crème b...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }
}

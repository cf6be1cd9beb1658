use anyhow::{Context, Result};
use std::process;

use mealplan_core::catalog::Catalog;
use mealplan_core::models::Recipe;

use super::helpers::{print_recipe_table, print_search_table};

pub(crate) fn cmd_recipes_list(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog.all())?);
    } else {
        let refs: Vec<&Recipe> = catalog.all().iter().collect();
        print_recipe_table(&refs);
    }
    Ok(())
}

pub(crate) fn cmd_recipes_show(catalog: &Catalog, id: i64, json: bool) -> Result<()> {
    let recipe = catalog
        .get(id)
        .with_context(|| format!("Recipe {id} not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(recipe)?);
        return Ok(());
    }

    println!("{} (id: {})", recipe.name, recipe.id);
    println!(
        "{} min, serves {} | {:.0} kcal, P {:.1}g C {:.1}g F {:.1}g",
        recipe.time, recipe.servings, recipe.calories, recipe.protein, recipe.carbs, recipe.fat
    );
    if !recipe.tags.is_empty() {
        println!("Tags: {}", recipe.tags.join(", "));
    }
    println!("\nIngredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {ingredient}");
    }
    if !recipe.steps.is_empty() {
        println!("\nSteps:");
        for (i, step) in recipe.steps.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipes_search(catalog: &Catalog, query: &str, json: bool) -> Result<()> {
    let results = catalog.search(query)?;

    if results.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found for '{query}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_search_table(&results);
    }
    Ok(())
}

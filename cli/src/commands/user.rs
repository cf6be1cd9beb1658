use anyhow::Result;

use mealplan_core::credentials::{hash_password, validate_password};
use mealplan_core::db::Database;
use mealplan_core::models::{NewUser, validate_email};

pub(crate) fn cmd_user_add(
    db: &Database,
    email: &str,
    password: &str,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let email = validate_email(email)?;
    validate_password(password)?;

    let user = db.create_user(&NewUser {
        email,
        name,
        password_hash: hash_password(password),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Added user: {} (id: {})", user.email, user.id);
    }
    Ok(())
}

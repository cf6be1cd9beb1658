use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::credentials::{DEMO_EMAIL, DEMO_NAME, DEMO_PASSWORD, hash_password};
use crate::models::{DietaryPrefs, Goals, NewUser, Stats, User, WeeklyPlan};

/// Keyed tables, in creation order.
pub const TABLES: &[&str] = &["users", "dietary_prefs", "goals", "stats", "meal_table"];

pub struct Database {
    conn: Connection,
}

/// Insert hit the unique email index.
#[derive(Debug, thiserror::Error)]
#[error("User '{0}' already exists")]
pub struct DuplicateEmail(pub String);

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatus {
    pub table: String,
    pub exists: bool,
    pub rows: Option<i64>,
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to encode column value")
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    name TEXT,
                    password_hash TEXT NOT NULL,
                    favorite_recipes TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS dietary_prefs (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    restrictions TEXT NOT NULL DEFAULT '[]',
                    allergies TEXT NOT NULL DEFAULT '[]',
                    tools TEXT NOT NULL DEFAULT '[]',
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS goals (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    calories REAL NOT NULL DEFAULT 0,
                    protein REAL NOT NULL DEFAULT 0,
                    carbs REAL NOT NULL DEFAULT 0,
                    fat REAL NOT NULL DEFAULT 0,
                    fiber REAL NOT NULL DEFAULT 0,
                    sugar REAL NOT NULL DEFAULT 0,
                    cholesterol REAL NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS stats (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    points INTEGER NOT NULL DEFAULT 0,
                    cart_items INTEGER NOT NULL DEFAULT 0,
                    cart_contents TEXT NOT NULL DEFAULT '[]',
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_table (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    meal_plan TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Users ---

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            favorite_recipes: json_column(row, 4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO users (email, name, password_hash, favorite_recipes, created_at)
                 VALUES (?1, ?2, ?3, '[]', ?4)",
                params![user.email, user.name, user.password_hash, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    anyhow::Error::new(DuplicateEmail(user.email.clone()))
                } else {
                    anyhow::Error::new(e).context(format!("Failed to create user '{}'", user.email))
                }
            })?;
        let id = self.conn.last_insert_rowid();
        self.get_user_by_id(id)?
            .context("User disappeared right after insert")
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, password_hash, favorite_recipes, created_at
                 FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, password_hash, favorite_recipes, created_at
                 FROM users WHERE email = ?1",
                params![email.trim()],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Replace the user's favorites. Returns false when the user does not exist.
    pub fn set_favorites(&self, user_id: i64, recipe_ids: &[i64]) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE users SET favorite_recipes = ?1 WHERE id = ?2",
            params![to_json(recipe_ids)?, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Create the demo account if it is missing.
    pub fn seed_demo_user(&self) -> Result<User> {
        if let Some(user) = self.get_user_by_email(DEMO_EMAIL)? {
            return Ok(user);
        }
        self.create_user(&NewUser {
            email: DEMO_EMAIL.to_string(),
            name: Some(DEMO_NAME.to_string()),
            password_hash: hash_password(DEMO_PASSWORD),
        })
    }

    // --- Dietary preferences ---

    pub fn get_dietary_prefs(&self, user_id: i64) -> Result<Option<DietaryPrefs>> {
        let prefs = self
            .conn
            .query_row(
                "SELECT user_id, restrictions, allergies, tools FROM dietary_prefs WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(DietaryPrefs {
                        user_id: row.get(0)?,
                        restrictions: json_column(row, 1)?,
                        allergies: json_column(row, 2)?,
                        tools: json_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(prefs)
    }

    pub fn upsert_dietary_prefs(&self, prefs: &DietaryPrefs) -> Result<DietaryPrefs> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO dietary_prefs (user_id, restrictions, allergies, tools, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                prefs.user_id,
                to_json(&prefs.restrictions)?,
                to_json(&prefs.allergies)?,
                to_json(&prefs.tools)?,
                now
            ],
        )?;
        self.get_dietary_prefs(prefs.user_id)?
            .context("Dietary preferences not found after upsert")
    }

    pub fn delete_dietary_prefs(&self, user_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM dietary_prefs WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(rows > 0)
    }

    // --- Goals ---

    pub fn get_goals(&self, user_id: i64) -> Result<Option<Goals>> {
        let goals = self
            .conn
            .query_row(
                "SELECT user_id, calories, protein, carbs, fat, fiber, sugar, cholesterol
                 FROM goals WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Goals {
                        user_id: row.get(0)?,
                        calories: row.get(1)?,
                        protein: row.get(2)?,
                        carbs: row.get(3)?,
                        fat: row.get(4)?,
                        fiber: row.get(5)?,
                        sugar: row.get(6)?,
                        cholesterol: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(goals)
    }

    pub fn upsert_goals(&self, goals: &Goals) -> Result<Goals> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO goals
                (user_id, calories, protein, carbs, fat, fiber, sugar, cholesterol, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                goals.user_id,
                goals.calories,
                goals.protein,
                goals.carbs,
                goals.fat,
                goals.fiber,
                goals.sugar,
                goals.cholesterol,
                now
            ],
        )?;
        self.get_goals(goals.user_id)?
            .context("Goals not found after upsert")
    }

    pub fn delete_goals(&self, user_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM goals WHERE user_id = ?1", params![user_id])?;
        Ok(rows > 0)
    }

    // --- Stats ---

    pub fn get_stats(&self, user_id: i64) -> Result<Option<Stats>> {
        let stats = self
            .conn
            .query_row(
                "SELECT user_id, points, cart_items, cart_contents FROM stats WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Stats {
                        user_id: row.get(0)?,
                        points: row.get(1)?,
                        cart_items: row.get(2)?,
                        cart_contents: json_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }

    pub fn upsert_stats(&self, stats: &Stats) -> Result<Stats> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO stats (user_id, points, cart_items, cart_contents, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stats.user_id,
                stats.points,
                stats.cart_items,
                to_json(&stats.cart_contents)?,
                now
            ],
        )?;
        self.get_stats(stats.user_id)?
            .context("Stats not found after upsert")
    }

    pub fn delete_stats(&self, user_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM stats WHERE user_id = ?1", params![user_id])?;
        Ok(rows > 0)
    }

    // --- Meal plans ---

    pub fn get_meal_plan(&self, user_id: i64) -> Result<Option<WeeklyPlan>> {
        let plan = self
            .conn
            .query_row(
                "SELECT meal_plan FROM meal_table WHERE user_id = ?1",
                params![user_id],
                |row| json_column(row, 0),
            )
            .optional()?;
        Ok(plan)
    }

    pub fn upsert_meal_plan(&self, user_id: i64, plan: &WeeklyPlan) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO meal_table (user_id, meal_plan, updated_at) VALUES (?1, ?2, ?3)",
            params![user_id, to_json(plan)?, now],
        )?;
        Ok(())
    }

    pub fn delete_meal_plan(&self, user_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_table WHERE user_id = ?1", params![user_id])?;
        Ok(rows > 0)
    }

    // --- Maintenance ---

    /// Existence and row count of every keyed table.
    pub fn table_status(&self) -> Result<Vec<TableStatus>> {
        let mut out = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![table],
                |row| row.get(0),
            )?;
            let rows = if exists {
                Some(
                    self.conn
                        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?,
                )
            } else {
                None
            };
            out.push(TableStatus {
                table: (*table).to_string(),
                exists,
                rows,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::verify_password;
    use crate::models::{Day, MealType};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: Some("Sam".to_string()),
            password_hash: hash_password("secret1"),
        }
    }

    #[test]
    fn test_migration_creates_all_tables() {
        let db = Database::open_in_memory().unwrap();
        let status = db.table_status().unwrap();
        assert_eq!(status.len(), TABLES.len());
        for s in status {
            assert!(s.exists, "{} missing", s.table);
            assert_eq!(s.rows, Some(0));
        }
    }

    #[test]
    fn test_open_file_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mealplan.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_user(&new_user("a@b.com")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.get_user_by_email("a@b.com").unwrap().is_some());
    }

    #[test]
    fn test_create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        assert_eq!(user.email, "sam@example.com");
        assert_eq!(user.name.as_deref(), Some("Sam"));
        assert!(user.favorite_recipes.is_empty());
        assert!(verify_password("secret1", &user.password_hash));

        let by_id = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id, user);
    }

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("sam@example.com")).unwrap();
        assert!(db.get_user_by_email("SAM@example.com").unwrap().is_some());
        assert!(db.get_user_by_email("other@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("sam@example.com")).unwrap();
        let err = db.create_user(&new_user("Sam@Example.com")).unwrap_err();
        let dup = err.downcast_ref::<DuplicateEmail>().unwrap();
        assert_eq!(dup.0, "Sam@Example.com");
    }

    #[test]
    fn test_seed_demo_user_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = db.seed_demo_user().unwrap();
        let second = db.seed_demo_user().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.email, DEMO_EMAIL);
        assert!(verify_password(DEMO_PASSWORD, &first.password_hash));
    }

    #[test]
    fn test_set_favorites() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        assert!(db.set_favorites(user.id, &[3, 1, 2]).unwrap());
        let user = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(user.favorite_recipes, vec![3, 1, 2]);

        assert!(!db.set_favorites(999, &[1]).unwrap());
    }

    #[test]
    fn test_dietary_prefs_upsert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        assert!(db.get_dietary_prefs(user.id).unwrap().is_none());

        let prefs = DietaryPrefs {
            user_id: user.id,
            restrictions: vec!["vegan".to_string()],
            allergies: vec!["peanuts".to_string()],
            tools: vec![],
        };
        let first = db.upsert_dietary_prefs(&prefs).unwrap();
        let second = db.upsert_dietary_prefs(&prefs).unwrap();
        assert_eq!(first, prefs);
        assert_eq!(second, first);

        assert!(db.delete_dietary_prefs(user.id).unwrap());
        assert!(!db.delete_dietary_prefs(user.id).unwrap());
        assert!(db.get_dietary_prefs(user.id).unwrap().is_none());
    }

    #[test]
    fn test_goals_upsert_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();

        let mut goals = Goals::empty(user.id);
        goals.calories = 2000.0;
        goals.protein = 150.0;
        db.upsert_goals(&goals).unwrap();

        goals.calories = 1800.0;
        let saved = db.upsert_goals(&goals).unwrap();
        assert_eq!(saved, goals);
        assert!(db.delete_goals(user.id).unwrap());
        assert!(db.get_goals(user.id).unwrap().is_none());
    }

    #[test]
    fn test_stats_roundtrip_cart_contents() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();

        let stats = Stats {
            user_id: user.id,
            points: 40,
            cart_items: 2,
            cart_contents: vec![
                serde_json::json!({"name": "oats", "quantity": 1}),
                serde_json::json!("lemons"),
            ],
        };
        assert_eq!(db.upsert_stats(&stats).unwrap(), stats);
        assert!(db.delete_stats(user.id).unwrap());
    }

    #[test]
    fn test_meal_plan_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        assert!(db.get_meal_plan(user.id).unwrap().is_none());

        let mut plan = WeeklyPlan::new();
        plan.set_slot(Day::Monday, MealType::Lunch, 7);
        db.upsert_meal_plan(user.id, &plan).unwrap();
        assert_eq!(db.get_meal_plan(user.id).unwrap(), Some(plan));

        assert!(db.delete_meal_plan(user.id).unwrap());
        assert!(db.get_meal_plan(user.id).unwrap().is_none());
    }

    #[test]
    fn test_rows_require_existing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.upsert_goals(&Goals::empty(42)).is_err());
    }

    #[test]
    fn test_table_status_counts_rows() {
        let db = Database::open_in_memory().unwrap();
        db.seed_demo_user().unwrap();
        let status = db.table_status().unwrap();
        let users = status.iter().find(|s| s.table == "users").unwrap();
        assert_eq!(users.rows, Some(1));
    }
}

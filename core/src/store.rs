//! Async storage boundary used by the HTTP layer.
//!
//! Handlers only see [`Store`]; [`SqliteStore`] backs it with a single
//! mutex-guarded [`Database`] connection.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{Database, TableStatus};
use crate::models::{DietaryPrefs, Day, Goals, MealType, NewUser, Stats, User, WeeklyPlan};

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn set_favorites(&self, user_id: i64, recipe_ids: Vec<i64>) -> Result<bool>;

    async fn dietary_prefs(&self, user_id: i64) -> Result<Option<DietaryPrefs>>;
    async fn save_dietary_prefs(&self, prefs: DietaryPrefs) -> Result<DietaryPrefs>;
    async fn delete_dietary_prefs(&self, user_id: i64) -> Result<bool>;

    async fn goals(&self, user_id: i64) -> Result<Option<Goals>>;
    async fn save_goals(&self, goals: Goals) -> Result<Goals>;
    async fn delete_goals(&self, user_id: i64) -> Result<bool>;

    async fn stats(&self, user_id: i64) -> Result<Option<Stats>>;
    async fn save_stats(&self, stats: Stats) -> Result<Stats>;
    async fn delete_stats(&self, user_id: i64) -> Result<bool>;

    async fn meal_plan(&self, user_id: i64) -> Result<Option<WeeklyPlan>>;
    async fn save_meal_plan(&self, user_id: i64, plan: WeeklyPlan) -> Result<WeeklyPlan>;

    /// Set one slot, creating the plan if needed. Returns the updated plan.
    async fn set_meal_slot(
        &self,
        user_id: i64,
        day: Day,
        meal: MealType,
        recipe_id: i64,
    ) -> Result<WeeklyPlan>;

    /// Clear one slot. `None` when the slot was not planned; an empty plan
    /// means the stored row was removed.
    async fn remove_meal_slot(
        &self,
        user_id: i64,
        day: Day,
        meal: MealType,
    ) -> Result<Option<WeeklyPlan>>;

    async fn table_status(&self) -> Result<Vec<TableStatus>>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        f(&db)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.with_db(|db| db.create_user(&user))
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_db(|db| db.get_user_by_id(id))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_db(|db| db.get_user_by_email(email))
    }

    async fn set_favorites(&self, user_id: i64, recipe_ids: Vec<i64>) -> Result<bool> {
        self.with_db(|db| db.set_favorites(user_id, &recipe_ids))
    }

    async fn dietary_prefs(&self, user_id: i64) -> Result<Option<DietaryPrefs>> {
        self.with_db(|db| db.get_dietary_prefs(user_id))
    }

    async fn save_dietary_prefs(&self, prefs: DietaryPrefs) -> Result<DietaryPrefs> {
        self.with_db(|db| db.upsert_dietary_prefs(&prefs))
    }

    async fn delete_dietary_prefs(&self, user_id: i64) -> Result<bool> {
        self.with_db(|db| db.delete_dietary_prefs(user_id))
    }

    async fn goals(&self, user_id: i64) -> Result<Option<Goals>> {
        self.with_db(|db| db.get_goals(user_id))
    }

    async fn save_goals(&self, goals: Goals) -> Result<Goals> {
        self.with_db(|db| db.upsert_goals(&goals))
    }

    async fn delete_goals(&self, user_id: i64) -> Result<bool> {
        self.with_db(|db| db.delete_goals(user_id))
    }

    async fn stats(&self, user_id: i64) -> Result<Option<Stats>> {
        self.with_db(|db| db.get_stats(user_id))
    }

    async fn save_stats(&self, stats: Stats) -> Result<Stats> {
        self.with_db(|db| db.upsert_stats(&stats))
    }

    async fn delete_stats(&self, user_id: i64) -> Result<bool> {
        self.with_db(|db| db.delete_stats(user_id))
    }

    async fn meal_plan(&self, user_id: i64) -> Result<Option<WeeklyPlan>> {
        self.with_db(|db| db.get_meal_plan(user_id))
    }

    async fn save_meal_plan(&self, user_id: i64, plan: WeeklyPlan) -> Result<WeeklyPlan> {
        self.with_db(|db| {
            db.upsert_meal_plan(user_id, &plan)?;
            Ok(plan)
        })
    }

    async fn set_meal_slot(
        &self,
        user_id: i64,
        day: Day,
        meal: MealType,
        recipe_id: i64,
    ) -> Result<WeeklyPlan> {
        self.with_db(|db| {
            let mut plan = db.get_meal_plan(user_id)?.unwrap_or_default();
            plan.set_slot(day, meal, recipe_id);
            db.upsert_meal_plan(user_id, &plan)?;
            Ok(plan)
        })
    }

    async fn remove_meal_slot(
        &self,
        user_id: i64,
        day: Day,
        meal: MealType,
    ) -> Result<Option<WeeklyPlan>> {
        self.with_db(|db| {
            let Some(mut plan) = db.get_meal_plan(user_id)? else {
                return Ok(None);
            };
            if !plan.remove_slot(day, meal) {
                return Ok(None);
            }
            if plan.is_empty() {
                db.delete_meal_plan(user_id)?;
            } else {
                db.upsert_meal_plan(user_id, &plan)?;
            }
            Ok(Some(plan))
        })
    }

    async fn table_status(&self) -> Result<Vec<TableStatus>> {
        self.with_db(Database::table_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DEMO_EMAIL, hash_password};

    fn store_with_demo() -> (SqliteStore, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.seed_demo_user().unwrap();
        (SqliteStore::new(db), user.id)
    }

    #[tokio::test]
    async fn test_users_through_store() {
        let (store, demo_id) = store_with_demo();
        let demo = store.user_by_email(DEMO_EMAIL).await.unwrap().unwrap();
        assert_eq!(demo.id, demo_id);

        let created = store
            .create_user(NewUser {
                email: "new@example.com".to_string(),
                name: None,
                password_hash: hash_password("hunter22"),
            })
            .await
            .unwrap();
        assert_ne!(created.id, demo_id);
        assert!(store.user_by_id(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_goals_and_stats() {
        let (store, id) = store_with_demo();
        assert!(!store.delete_goals(id).await.unwrap());
        assert!(!store.delete_stats(id).await.unwrap());

        let mut goals = Goals::empty(id);
        goals.calories = 2000.0;
        store.save_goals(goals).await.unwrap();
        let mut stats = Stats::empty(id);
        stats.points = 7;
        store.save_stats(stats).await.unwrap();

        assert!(store.delete_goals(id).await.unwrap());
        assert!(store.delete_stats(id).await.unwrap());
        assert!(store.goals(id).await.unwrap().is_none());
        assert!(store.stats(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_slot_creates_plan() {
        let (store, id) = store_with_demo();
        assert!(store.meal_plan(id).await.unwrap().is_none());

        let plan = store
            .set_meal_slot(id, Day::Monday, MealType::Dinner, 3)
            .await
            .unwrap();
        assert_eq!(plan.get(Day::Monday, MealType::Dinner), Some(3));
        assert_eq!(store.meal_plan(id).await.unwrap(), Some(plan));
    }

    #[tokio::test]
    async fn test_removing_last_slot_deletes_row() {
        let (store, id) = store_with_demo();
        store
            .set_meal_slot(id, Day::Friday, MealType::Lunch, 5)
            .await
            .unwrap();

        let plan = store
            .remove_meal_slot(id, Day::Friday, MealType::Lunch)
            .await
            .unwrap()
            .unwrap();
        assert!(plan.is_empty());
        assert!(store.meal_plan(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_removing_absent_slot_is_none() {
        let (store, id) = store_with_demo();
        assert!(
            store
                .remove_meal_slot(id, Day::Friday, MealType::Lunch)
                .await
                .unwrap()
                .is_none()
        );

        store
            .set_meal_slot(id, Day::Friday, MealType::Lunch, 5)
            .await
            .unwrap();
        assert!(
            store
                .remove_meal_slot(id, Day::Friday, MealType::Dinner)
                .await
                .unwrap()
                .is_none()
        );
        let plan = store.meal_plan(id).await.unwrap().unwrap();
        assert_eq!(plan.get(Day::Friday, MealType::Lunch), Some(5));
    }

    #[tokio::test]
    async fn test_store_is_shareable_across_tasks() {
        let (store, id) = store_with_demo();
        let store: Arc<dyn Store> = Arc::new(store);

        let mut handles = Vec::new();
        for (i, day) in Day::ALL.into_iter().enumerate() {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set_meal_slot(id, day, MealType::Breakfast, i as i64 + 1)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let plan = store.meal_plan(id).await.unwrap().unwrap();
        assert_eq!(plan.day_count(), 7);
    }
}

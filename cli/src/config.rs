use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use mealplan_core::catalog::Catalog;
use mealplan_core::db::Database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite(PathBuf),
    /// In-memory database seeded with the demo account.
    Unconfigured,
}

pub struct Config {
    pub backend: Backend,
    pub catalog_path: Option<PathBuf>,
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "mealplan").context("Could not determine home directory")?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    Ok(data_dir.join("mealplan.db"))
}

impl Config {
    /// Build the runtime configuration from the `MEALPLAN_*` settings.
    pub fn resolve(
        backend: Option<&str>,
        db_path: Option<PathBuf>,
        catalog_path: Option<PathBuf>,
    ) -> Result<Self> {
        let backend = match backend.map(|b| b.trim().to_lowercase()).as_deref() {
            None | Some("" | "memory") => Backend::Unconfigured,
            Some("sqlite") => Backend::Sqlite(match db_path {
                Some(path) => path,
                None => default_db_path()?,
            }),
            Some(other) => bail!("Unknown backend '{other}'. Must be one of: sqlite, memory"),
        };
        Ok(Config {
            backend,
            catalog_path,
        })
    }

    pub fn open_database(&self) -> Result<Database> {
        match &self.backend {
            Backend::Sqlite(path) => {
                let db = Database::open(path)?;
                tracing::info!(path = %path.display(), "using sqlite backend");
                Ok(db)
            }
            Backend::Unconfigured => {
                let db = Database::open_in_memory()?;
                let demo = db.seed_demo_user()?;
                tracing::warn!(
                    demo_user = %demo.email,
                    "no backend configured; using a throwaway in-memory database"
                );
                Ok(db)
            }
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        let catalog = match &self.catalog_path {
            Some(path) => load_catalog_file(path)?,
            None => Catalog::bundled()?,
        };
        tracing::info!(recipes = catalog.len(), "recipe catalog loaded");
        Ok(catalog)
    }
}

fn load_catalog_file(path: &Path) -> Result<Catalog> {
    Catalog::from_path(path)
        .with_context(|| format!("Failed to load recipe catalog: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealplan_core::credentials::DEMO_EMAIL;

    #[test]
    fn unset_backend_is_unconfigured() {
        for value in [None, Some(""), Some("memory"), Some("MEMORY")] {
            let config = Config::resolve(value, None, None).unwrap();
            assert_eq!(config.backend, Backend::Unconfigured);
        }
    }

    #[test]
    fn sqlite_backend_uses_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.db");
        let config = Config::resolve(Some("sqlite"), Some(path.clone()), None).unwrap();
        assert_eq!(config.backend, Backend::Sqlite(path.clone()));

        config.open_database().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unknown_backend_rejected() {
        assert!(Config::resolve(Some("postgres"), None, None).is_err());
    }

    #[test]
    fn unconfigured_database_has_demo_user() {
        let config = Config::resolve(None, None, None).unwrap();
        let db = config.open_database().unwrap();
        let demo = db.get_user_by_email(DEMO_EMAIL).unwrap().unwrap();
        assert_eq!(demo.id, 1);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let config = Config::resolve(None, None, Some(PathBuf::from("/nonexistent/recipes.json")))
            .unwrap();
        assert!(config.load_catalog().is_err());
        let bundled = Config::resolve(None, None, None).unwrap();
        assert_eq!(bundled.load_catalog().unwrap().len(), 24);
    }
}

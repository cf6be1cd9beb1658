mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_db_check, cmd_plan, cmd_recipes_list, cmd_recipes_search, cmd_recipes_show, cmd_user_add,
};
use crate::config::Config;
use mealplan_core::store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "mealplan",
    version,
    about = "Weekly meal planning service",
    long_about = "Weekly meal planning service.\n\nRuns the JSON API and offers a few maintenance commands over the same recipe catalog and database."
)]
struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, global = true, env = "MEALPLAN_BACKEND")]
    backend: Option<String>,
    /// SQLite database file (default: data directory/mealplan.db)
    #[arg(long, global = true, env = "MEALPLAN_DB_PATH")]
    db_path: Option<PathBuf>,
    /// Recipe catalog JSON file (default: bundled catalog)
    #[arg(long, global = true, env = "MEALPLAN_CATALOG")]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Generate a weekly plan and print it
    Plan {
        /// Dietary restriction (vegetarian, vegan); repeatable
        #[arg(short, long = "restriction")]
        restrictions: Vec<String>,
        /// Fall back to this user's saved dietary preferences
        #[arg(long)]
        user: Option<String>,
        /// Seed for a repeatable plan
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse the recipe catalog
    Recipes {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List every recipe
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe with ingredients and steps
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search recipes by name, tag or ingredient
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user account
    Add {
        /// Email address
        email: String,
        /// Password
        password: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Report which tables exist and how many rows they hold
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.backend.as_deref(), cli.db_path, cli.catalog)?;
    let catalog = config.load_catalog()?;

    match cli.command {
        Commands::Serve { port, bind } => {
            let db = config.open_database()?;
            let state = server::AppState::new(Arc::new(SqliteStore::new(db)), Arc::new(catalog));
            server::start_server(state, port, &bind).await
        }
        Commands::Plan {
            restrictions,
            user,
            seed,
            json,
        } => {
            let db = config.open_database()?;
            cmd_plan(&db, &catalog, restrictions, user.as_deref(), seed, json)
        }
        Commands::Recipes { command } => match command {
            RecipeCommands::List { json } => cmd_recipes_list(&catalog, json),
            RecipeCommands::Show { id, json } => cmd_recipes_show(&catalog, id, json),
            RecipeCommands::Search { query, json } => cmd_recipes_search(&catalog, &query, json),
        },
        Commands::User { command } => match command {
            UserCommands::Add {
                email,
                password,
                name,
                json,
            } => {
                let db = config.open_database()?;
                cmd_user_add(&db, &email, &password, name, json)
            }
        },
        Commands::Db { command } => match command {
            DbCommands::Check { json } => {
                let db = config.open_database()?;
                cmd_db_check(&db, json)
            }
        },
    }
}

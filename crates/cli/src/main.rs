//! Stockroom CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stockroom-cli migrate
//!
//! # Create a user (password read from stdin)
//! echo 'correct horse' | stockroom-cli user create -u alice -n "Alice Tan" -p "+65 9123 4567"
//!
//! # Seed items from a YAML list
//! stockroom-cli seed items fixtures/items.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKROOM_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stockroom-cli")]
#[command(author, version, about = "Stockroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user; the password is read from stdin
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Phone number
        #[arg(short, long)]
        phone: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert items from a YAML list, skipping names that already exist
    Items {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                name,
                phone,
            } => {
                commands::user::create(&username, &name, &phone).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Items { file } => commands::seed::items(&file).await?,
        },
    }
    Ok(())
}

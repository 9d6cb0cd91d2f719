//! Plate Shop CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (including the session table)
//! plateshop migrate
//!
//! # Give a registered user the operator role
//! plateshop operator grant -e ops@example.com
//!
//! # Take it away again
//! plateshop operator revoke -e ops@example.com
//!
//! # Load catalog entries from YAML
//! plateshop catalog seed -f catalog.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plateshop")]
#[command(author, version, about = "Plate Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage operator accounts
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
    /// Manage the plate catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Grant the operator role to a registered user
    Grant {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an operator to the customer role
    Revoke {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Create catalog entries from a YAML file
    Seed {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
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
        Commands::Operator { action } => match action {
            OperatorAction::Grant { email } => commands::operator::grant(&email).await?,
            OperatorAction::Revoke { email } => commands::operator::revoke(&email).await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Seed { file, dry_run } => {
                commands::seed::catalog(&file, dry_run).await?;
            }
        },
    }
    Ok(())
}

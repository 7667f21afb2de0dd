//! Atelier CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! atelier migrate
//!
//! # Create a customer (password read from stdin)
//! echo 's3cret-pass' | atelier user create -e meera@example.com -n "Meera"
//!
//! # Create an admin directly
//! echo 's3cret-pass' | atelier user create -e staff@example.com -n "Staff" --admin
//!
//! # Change a user's role
//! atelier user promote -e meera@example.com --role admin
//!
//! # Load collections and products from YAML
//! atelier seed catalog data/catalog.yaml
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply storefront database migrations
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
    /// Create a user; the password is read from stdin
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Create the user with the admin role
        #[arg(long)]
        admin: bool,
    },
    /// Change an existing user's role
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer` or `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert collections and insert missing products from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, name, admin } => {
                commands::user::create(&email, &name, admin).await?;
            }
            UserAction::Promote { email, role } => {
                commands::user::promote(&email, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
    }
    Ok(())
}

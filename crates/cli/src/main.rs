//! AquaMart CLI - database migrations and shop management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! aq-cli migrate
//!
//! # Create a seller account (password from AQUAMART_SELLER_PASSWORD or stdin)
//! aq-cli seller create -e owner@aquamart.in -n "Shop Owner" -p 9876543210
//!
//! # Load the catalog from YAML, hiding everything not in the file
//! aq-cli seed catalog data/catalog.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seller create` - Create seller accounts
//! - `seed catalog` - Load products from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aq-cli")]
#[command(author, version, about = "AquaMart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage seller accounts
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SellerAction {
    /// Create a new seller account
    Create {
        /// Seller email address
        #[arg(short, long)]
        email: String,

        /// Seller display name
        #[arg(short, long)]
        name: String,

        /// Indian mobile number
        #[arg(short, long)]
        phone: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load products from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        file: String,

        /// Deactivate every product before seeding
        #[arg(long)]
        clear: bool,
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seller { action } => match action {
            SellerAction::Create { email, name, phone } => {
                commands::seller::create(&email, &name, &phone).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, clear } => {
                commands::seed::catalog(&file, clear).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_seed_catalog_with_clear() {
        let cli = Cli::try_parse_from(["aq-cli", "seed", "catalog", "catalog.yaml", "--clear"])
            .expect("parse");
        match cli.command {
            Commands::Seed {
                target: SeedTarget::Catalog { file, clear },
            } => {
                assert_eq!(file, "catalog.yaml");
                assert!(clear);
            }
            _ => panic!("expected seed catalog"),
        }
    }

    #[test]
    fn seller_create_requires_phone() {
        let result = Cli::try_parse_from(["aq-cli", "seller", "create", "-e", "a@b.in", "-n", "Asha"]);
        assert!(result.is_err());
    }
}

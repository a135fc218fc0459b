//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod seller;

use secrecy::SecretString;
use thiserror::Error;

/// Primary database URL variable; `DATABASE_URL` is the fallback.
const DATABASE_URL_VAR: &str = "AQUAMART_DATABASE_URL";

/// Errors shared by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load `.env` and resolve the storefront database URL.
pub(crate) fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar(DATABASE_URL_VAR))
}

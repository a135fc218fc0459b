//! Seller account management.
//!
//! # Usage
//!
//! ```bash
//! AQUAMART_SELLER_PASSWORD=... aq-cli seller create -e owner@aquamart.in -n "Shop Owner" -p 9876543210
//! ```
//!
//! Without `AQUAMART_SELLER_PASSWORD` the password is read from stdin.

use std::io::{BufRead, Write};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use aquamart_core::UserRole;
use aquamart_storefront::db;
use aquamart_storefront::services::auth::{AuthError, AuthService, RegisterRequest};

use super::{CommandError, database_url};

/// Environment variable holding the new seller's password.
const PASSWORD_VAR: &str = "AQUAMART_SELLER_PASSWORD";

/// Errors that can occur while creating a seller.
#[derive(Debug, Error)]
pub enum SellerError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a seller account.
///
/// # Errors
///
/// Returns an error if the password can't be obtained, the input fails
/// validation, or the email is already registered.
pub async fn create(email: &str, name: &str, phone: &str) -> Result<(), SellerError> {
    let database_url = database_url()?;
    let password = read_password()?;

    let pool = db::create_pool(&database_url).await?;
    tracing::info!("Connected to database");

    let request = RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        password: password.expose_secret().to_string(),
    };
    let user = AuthService::new(&pool)
        .create_account(&request, UserRole::Seller)
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Seller account created");
    Ok(())
}

fn read_password() -> Result<SecretString, SellerError> {
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        return non_empty(&password);
    }

    #[allow(clippy::print_stderr)]
    {
        eprint!("Password: ");
    }
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    non_empty(&line)
}

/// Strip the trailing newline and reject blank input.
fn non_empty(raw: &str) -> Result<SecretString, SellerError> {
    let password = raw.trim_end_matches(['\r', '\n']);
    if password.trim().is_empty() {
        return Err(SellerError::EmptyPassword);
    }
    Ok(SecretString::from(password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_endings_only() {
        let password = non_empty("  s3cret pass \r\n").expect("password");
        assert_eq!(password.expose_secret(), "  s3cret pass ");
    }

    #[test]
    fn rejects_blank_password() {
        assert!(matches!(non_empty("   \n"), Err(SellerError::EmptyPassword)));
        assert!(matches!(non_empty(""), Err(SellerError::EmptyPassword)));
    }
}

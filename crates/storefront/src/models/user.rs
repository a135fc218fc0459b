//! User account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aquamart_core::{Email, Phone, UserId, UserRole};

use super::CurrentUser;

/// A storefront account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Contact number for deliveries.
    #[sqlx(try_from = "String")]
    pub phone: Phone,
    /// Customer or seller.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

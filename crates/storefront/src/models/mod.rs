//! Domain models for storefront.
//!
//! Row types are decoded with `sqlx::FromRow` and serialized straight into
//! API responses. Request bodies live next to the rows they create and carry
//! their own `validate` methods.

pub mod address;
pub mod booking;
pub mod cart;
pub mod dashboard;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod session;
pub mod user;

use serde::Serialize;
use thiserror::Error;

pub use address::{Address, AddressInput, ShippingAddress};
pub use booking::{Booking, BookingRequest, BookingUpdate};
pub use cart::{CartLine, CartSummary, Totals};
pub use notification::{NewNotification, Notification};
pub use order::{
    CheckoutRequest, Order, OrderDetail, OrderItem, OrderListQuery, ShipRequest, StatusHistoryEntry,
    StatusUpdateRequest,
};
pub use payment::{CancelRequest, CreatePaymentRequest, PaymentOrder, VerifyPaymentRequest};
pub use product::{Product, ProductImage, ProductInput, ProductQuery, ProductSort};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;

/// Default page size for paginated listings.
pub const DEFAULT_PER_PAGE: i64 = 12;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 50;

/// A request field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field as sent by the client.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check that a trimmed string's length (in characters) is within bounds.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field` when the value is too short or too long.
pub fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(if min == 1 {
            ValidationError::new(field, "is required")
        } else {
            ValidationError::new(field, format!("must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number.
    pub page: i64,
    /// Items per page.
    pub per_page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Validate optional query parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `page < 1` or `per_page` is outside `1..=50`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(ValidationError::new("page", "must be at least 1"));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(ValidationError::new(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        Ok(Self { page, per_page })
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.per_page
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the unpaginated total.
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + pagination.per_page - 1) / pagination.per_page
        };
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_offset() {
        let p = Pagination::new(None, None).unwrap();
        assert_eq!(p, Pagination::default());
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(Some(3), Some(20)).unwrap();
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::new(Some(0), None).unwrap_err().field, "page");
        assert_eq!(Pagination::new(None, Some(0)).unwrap_err().field, "per_page");
        assert_eq!(Pagination::new(None, Some(51)).unwrap_err().field, "per_page");
        assert!(Pagination::new(None, Some(50)).is_ok());
    }

    #[test]
    fn test_page_total_pages() {
        let p = Pagination::new(Some(1), Some(12)).unwrap();
        assert_eq!(Page::new(Vec::<i32>::new(), p, 0).total_pages, 0);
        assert_eq!(Page::new(Vec::<i32>::new(), p, 12).total_pages, 1);
        assert_eq!(Page::new(Vec::<i32>::new(), p, 13).total_pages, 2);
    }

    #[test]
    fn test_check_length() {
        assert!(check_length("name", "Asha", 2, 60).is_ok());
        assert_eq!(
            check_length("name", " ", 1, 60).unwrap_err().to_string(),
            "name: is required"
        );
        assert_eq!(
            check_length("name", "A", 2, 60).unwrap_err().to_string(),
            "name: must be at least 2 characters"
        );
        assert!(check_length("notes", &"x".repeat(501), 0, 500).is_err());
    }
}

//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and seller account creation
//! - `catalog` - Cached product reads, seller catalog writes and images
//! - `orders` - Checkout, status lifecycle, payments, courier webhooks
//! - `bookings` - Service visit requests and scheduling
//! - `notifier` - Stored notifications and the live push hub
//! - `email` - Transactional email
//!
//! Services borrow the pool and shared state for the duration of one request.

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod email;
pub mod notifier;
pub mod orders;

use chrono::{FixedOffset, NaiveDate, Utc};

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Today's date in the shop's time zone (IST).
///
/// Order numbers and booking date checks use the local calendar day.
#[must_use]
pub fn shop_today() -> NaiveDate {
    let now = Utc::now();
    FixedOffset::east_opt(IST_OFFSET_SECONDS)
        .map_or_else(|| now.date_naive(), |ist| now.with_timezone(&ist).date_naive())
}

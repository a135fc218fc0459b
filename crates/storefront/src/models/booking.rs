//! Service visit bookings (installation, repair, filter replacement, AMC).

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use aquamart_core::{BookingId, BookingStatus, ProductId, ServiceKind, TimeSlot, UserId};

use super::{ShippingAddress, ValidationError, check_length};

/// How far ahead a visit can be requested.
pub const MAX_DAYS_AHEAD: u64 = 60;

/// A service booking.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub service: ServiceKind,
    pub product_id: Option<ProductId>,
    pub preferred_date: NaiveDate,
    pub time_slot: TimeSlot,
    #[sqlx(json)]
    pub address: ShippingAddress,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub technician_name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub service: ServiceKind,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub preferred_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub address: ShippingAddress,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Validate against today's date.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.preferred_date < today {
            return Err(ValidationError::new("preferred_date", "cannot be in the past"));
        }
        let last = today
            .checked_add_days(Days::new(MAX_DAYS_AHEAD))
            .unwrap_or(NaiveDate::MAX);
        if self.preferred_date > last {
            return Err(ValidationError::new(
                "preferred_date",
                format!("must be within {MAX_DAYS_AHEAD} days"),
            ));
        }
        self.address.validate()?;
        if let Some(notes) = &self.notes {
            check_length("notes", notes, 0, 500)?;
        }
        Ok(())
    }

    /// Notes with blank values treated as absent.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Request body for `PATCH /api/seller/bookings/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingUpdate {
    pub status: BookingStatus,
    #[serde(default)]
    pub technician_name: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl BookingUpdate {
    /// Validate field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.technician_name {
            check_length("technician_name", name, 2, 60)?;
        }
        if self.status == BookingStatus::Scheduled && self.scheduled_at.is_none() {
            return Err(ValidationError::new(
                "scheduled_at",
                "is required when scheduling a visit",
            ));
        }
        Ok(())
    }
}

/// Query parameters for seller booking listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(date: &str) -> BookingRequest {
        serde_json::from_value(serde_json::json!({
            "service": "filter_replacement",
            "preferred_date": date,
            "time_slot": "morning",
            "address": {
                "name": "Asha Rao",
                "phone": "9845012345",
                "line1": "12, 4th Cross",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pincode": "560038"
            },
            "notes": "Gate code 1234"
        }))
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_date_window() {
        assert!(request("2026-10-16").validate(today()).is_ok());
        assert!(request("2026-12-15").validate(today()).is_ok());
        assert_eq!(
            request("2026-10-15").validate(today()).unwrap_err().field,
            "preferred_date"
        );
        assert_eq!(
            request("2026-12-16").validate(today()).unwrap_err().field,
            "preferred_date"
        );
    }

    #[test]
    fn test_notes_length() {
        let mut req = request("2026-10-20");
        req.notes = Some("x".repeat(501));
        assert_eq!(req.validate(today()).unwrap_err().field, "notes");
        req.notes = Some("   ".to_string());
        assert_eq!(req.notes(), None);
    }

    #[test]
    fn test_schedule_requires_time() {
        let update: BookingUpdate = serde_json::from_str(r#"{"status": "scheduled"}"#).unwrap();
        assert_eq!(update.validate().unwrap_err().field, "scheduled_at");

        let update: BookingUpdate = serde_json::from_str(
            r#"{"status": "scheduled", "scheduled_at": "2026-10-18T04:30:00Z", "technician_name": "Ravi"}"#,
        )
        .unwrap();
        assert!(update.validate().is_ok());
    }
}

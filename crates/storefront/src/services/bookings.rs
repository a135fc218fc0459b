//! Service visit bookings.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use aquamart_core::{BookingId, BookingStatus, NotificationKind, UserId};

use crate::db::{BookingRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{Booking, BookingRequest, BookingUpdate, NewNotification, ValidationError};
use crate::services::email::{EmailService, booking_status_label};
use crate::services::notifier::{NotificationHub, Notifier};
use crate::services::shop_today;

/// Errors from booking operations. Display strings are shown to clients.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("Cannot move a booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Bookings that are {0} can no longer be cancelled")]
    NotCancellable(BookingStatus),
}

/// Booking operations for customers and sellers.
pub struct BookingService<'a> {
    pool: &'a PgPool,
    hub: &'a NotificationHub,
    email: Option<&'a EmailService>,
}

impl<'a> BookingService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        hub: &'a NotificationHub,
        email: Option<&'a EmailService>,
    ) -> Self {
        Self { pool, hub, email }
    }

    /// Request a visit.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Invalid` for bad dates, addresses, notes or an
    /// unknown product.
    #[instrument(skip(self, request), fields(service = %request.service))]
    pub async fn create(&self, user_id: UserId, request: &BookingRequest) -> Result<Booking, BookingError> {
        request.validate(shop_today())?;
        if let Some(product_id) = request.product_id
            && ProductRepository::new(self.pool)
                .get_by_id(product_id)
                .await?
                .is_none()
        {
            return Err(ValidationError::new("product_id", "unknown product").into());
        }

        let booking = BookingRepository::new(self.pool).create(user_id, request).await?;
        info!(booking_id = %booking.id, date = %booking.preferred_date, "booking requested");

        let notifier = Notifier::new(self.pool, self.hub);
        notifier
            .deliver(NewNotification {
                user_id,
                kind: NotificationKind::Booking,
                title: "Booking received".to_string(),
                message: booking_message(&booking),
                order_id: None,
            })
            .await;
        if let Err(e) = notifier
            .notify_sellers(
                NotificationKind::Booking,
                "New service booking",
                &format!(
                    "{} on {} ({}), {}",
                    booking.service.label(),
                    booking.preferred_date.format("%d %b"),
                    booking.time_slot,
                    booking.address.city
                ),
                None,
            )
            .await
        {
            warn!(booking_id = %booking.id, error = %e, "failed to notify sellers");
        }
        Ok(booking)
    }

    /// Customer cancels one of their open bookings.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotCancellable` once completed or cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_by_customer(&self, user_id: UserId, id: BookingId) -> Result<Booking, BookingError> {
        let booking = BookingRepository::new(self.pool)
            .get(id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or(BookingError::NotFound)?;
        if !booking.status.is_open() {
            return Err(BookingError::NotCancellable(booking.status));
        }
        self.apply(
            &booking,
            &BookingUpdate {
                status: BookingStatus::Cancelled,
                technician_name: None,
                scheduled_at: None,
            },
        )
        .await
    }

    /// Seller schedules, completes or cancels a booking.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidTransition` for backwards moves.
    #[instrument(skip(self, update), fields(status = %update.status))]
    pub async fn update(&self, id: BookingId, update: &BookingUpdate) -> Result<Booking, BookingError> {
        update.validate()?;
        let booking = BookingRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !booking.status.can_transition_to(update.status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: update.status,
            });
        }
        self.apply(&booking, update).await
    }

    async fn apply(&self, booking: &Booking, update: &BookingUpdate) -> Result<Booking, BookingError> {
        let updated = BookingRepository::new(self.pool)
            .update_status(booking.id, booking.status, update)
            .await?
            .ok_or(BookingError::InvalidTransition {
                from: booking.status,
                to: update.status,
            })?;
        info!(booking_id = %updated.id, from = %booking.status, to = %updated.status, "booking updated");
        self.announce(&updated).await;
        Ok(updated)
    }

    async fn announce(&self, booking: &Booking) {
        Notifier::new(self.pool, self.hub)
            .deliver(NewNotification {
                user_id: booking.user_id,
                kind: NotificationKind::Booking,
                title: format!(
                    "{} {}",
                    booking.service.label(),
                    booking_status_label(booking.status)
                ),
                message: booking_message(booking),
                order_id: None,
            })
            .await;

        let Some(email) = self.email.cloned() else {
            return;
        };
        let customer = match UserRepository::new(self.pool).get_by_id(booking.user_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => return,
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "customer lookup for email failed");
                return;
            }
        };
        let booking = booking.clone();
        tokio::spawn(async move {
            if let Err(e) = email
                .send_booking_update(customer.email.as_str(), &customer.name, &booking)
                .await
            {
                warn!(booking_id = %booking.id, error = %e, "failed to send booking email");
            }
        });
    }
}

/// One-line booking text for notifications.
#[must_use]
pub fn booking_message(booking: &Booking) -> String {
    let date = booking.preferred_date.format("%d %b %Y");
    match booking.status {
        BookingStatus::Requested => format!(
            "Your {} request for {date} ({}) has been received.",
            booking.service.label().to_lowercase(),
            booking.time_slot
        ),
        BookingStatus::Scheduled => {
            let when = booking.scheduled_at.map_or_else(
                || date.to_string(),
                |at| at.format("%d %b %Y %H:%M UTC").to_string(),
            );
            match &booking.technician_name {
                Some(technician) => format!("{technician} will visit on {when}."),
                None => format!("Your visit is scheduled for {when}."),
            }
        }
        BookingStatus::Completed => format!(
            "Your {} visit is complete. Thank you!",
            booking.service.label().to_lowercase()
        ),
        BookingStatus::Cancelled => format!("Your booking for {date} has been cancelled."),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use aquamart_core::{ServiceKind, TimeSlot};

    use super::*;

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(9),
            user_id: UserId::new(7),
            service: ServiceKind::FilterReplacement,
            product_id: None,
            preferred_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            time_slot: TimeSlot::Morning,
            address: serde_json::from_value(serde_json::json!({
                "name": "Asha Rao",
                "phone": "9845012345",
                "line1": "12, 4th Cross",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pincode": "560038"
            }))
            .unwrap(),
            notes: None,
            status,
            technician_name: None,
            scheduled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_booking_message_requested() {
        assert_eq!(
            booking_message(&booking(BookingStatus::Requested)),
            "Your filter replacement request for 20 Oct 2026 (morning) has been received."
        );
    }

    #[test]
    fn test_booking_message_scheduled_with_technician() {
        let mut b = booking(BookingStatus::Scheduled);
        b.technician_name = Some("Ravi".to_string());
        b.scheduled_at = Some(Utc.with_ymd_and_hms(2026, 10, 20, 4, 30, 0).unwrap());
        assert_eq!(booking_message(&b), "Ravi will visit on 20 Oct 2026 04:30 UTC.");
    }

    #[test]
    fn test_error_messages() {
        let err = BookingError::NotCancellable(BookingStatus::Completed);
        assert_eq!(err.to_string(), "Bookings that are completed can no longer be cancelled");
        let err: BookingError = ValidationError::new("notes", "must be at most 500 characters").into();
        assert_eq!(err.to_string(), "notes: must be at most 500 characters");
    }
}

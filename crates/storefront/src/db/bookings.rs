//! Service visit bookings.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use aquamart_core::{BookingId, BookingStatus, UserId};

use super::RepositoryError;
use crate::models::{Booking, BookingRequest, BookingUpdate, Pagination};

const BOOKING_COLUMNS: &str = "id, user_id, service, product_id, preferred_date, time_slot, \
                               address, notes, status, technician_name, scheduled_at, \
                               created_at, updated_at";

/// Repository for bookings.
pub struct BookingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookingRepository<'a> {
    /// Create a new booking repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new booking in `requested` state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        request: &BookingRequest,
    ) -> Result<Booking, RepositoryError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, service, product_id, preferred_date, time_slot, address, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(user_id)
        .bind(request.service)
        .bind(request.product_id)
        .bind(request.preferred_date)
        .bind(request.time_slot)
        .bind(Json(&request.address))
        .bind(request.notes())
        .fetch_one(self.pool)
        .await?;
        Ok(booking)
    }

    /// Get a booking by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(booking)
    }

    /// Bookings newest first, optionally for one customer and/or status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        user_id: Option<UserId>,
        status: Option<BookingStatus>,
        pagination: Pagination,
    ) -> Result<(Vec<Booking>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut count, user_id, status);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings"));
        push_filters(&mut select, user_id, status);
        select.push(" ORDER BY created_at DESC, id DESC");
        select.push(" LIMIT ").push_bind(pagination.limit());
        select.push(" OFFSET ").push_bind(pagination.offset());

        let bookings = select.build_query_as::<Booking>().fetch_all(self.pool).await?;
        Ok((bookings, total))
    }

    /// A customer's open bookings, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upcoming_for_user(&self, user_id: UserId) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1
               AND status IN ('requested', 'scheduled')
               AND preferred_date >= CURRENT_DATE
             ORDER BY preferred_date ASC, id ASC
             LIMIT 10"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(bookings)
    }

    /// Apply a status change guarded on the current status.
    ///
    /// Technician and schedule are only overwritten when provided.
    ///
    /// # Returns
    ///
    /// Returns `None` if the booking is no longer in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        update: &BookingUpdate,
    ) -> Result<Option<Booking>, RepositoryError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET
                status = $3,
                technician_name = COALESCE($4, technician_name),
                scheduled_at = COALESCE($5, scheduled_at),
                updated_at = now()
             WHERE id = $1 AND status = $2
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(from)
        .bind(update.status)
        .bind(update.technician_name.as_deref().map(str::trim))
        .bind(update.scheduled_at)
        .fetch_optional(self.pool)
        .await?;
        Ok(booking)
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    user_id: Option<UserId>,
    status: Option<BookingStatus>,
) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
}

//! Courier webhook event log.

use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use aquamart_core::{OrderId, OrderStatus};

use super::RepositoryError;

/// A received courier event.
#[derive(Debug, Clone)]
pub struct NewShipmentEvent<'a> {
    pub order_id: Option<OrderId>,
    pub awb_number: &'a str,
    pub raw_status: &'a str,
    pub status_time: &'a str,
    pub mapped_status: Option<OrderStatus>,
    pub payload: &'a Value,
}

/// The stored row for a received event.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct RecordedEvent {
    pub id: i32,
    pub order_id: Option<OrderId>,
    /// An earlier delivery of this event was fully processed.
    pub handled: bool,
}

/// A stored event as the log keeps it.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct StoredShipmentEvent {
    pub id: i32,
    pub order_id: Option<OrderId>,
    pub mapped_status: Option<OrderStatus>,
    /// The event moved the order.
    pub applied: bool,
    pub handled: bool,
}

/// Repository for `shipment_events`.
pub struct ShipmentEventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShipmentEventRepository<'a> {
    /// Create a new shipment event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an event, or find the copy stored by an earlier delivery.
    ///
    /// A stored copy that had no order gets linked to `order_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record(&self, event: &NewShipmentEvent<'_>) -> Result<RecordedEvent, RepositoryError> {
        let recorded = sqlx::query_as::<_, RecordedEvent>(
            "INSERT INTO shipment_events
                (order_id, awb_number, raw_status, status_time, mapped_status, payload)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (awb_number, raw_status, status_time) DO UPDATE
                SET order_id = COALESCE(shipment_events.order_id, EXCLUDED.order_id)
             RETURNING id, order_id, handled",
        )
        .bind(event.order_id)
        .bind(event.awb_number)
        .bind(event.raw_status)
        .bind(event.status_time)
        .bind(event.mapped_status)
        .bind(Json(event.payload))
        .fetch_one(self.pool)
        .await?;
        Ok(recorded)
    }

    /// Flag an event as dealt with without changing the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_handled(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shipment_events SET handled = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Look up an event by its idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        awb_number: &str,
        raw_status: &str,
        status_time: &str,
    ) -> Result<Option<StoredShipmentEvent>, RepositoryError> {
        let event = sqlx::query_as::<_, StoredShipmentEvent>(
            "SELECT id, order_id, mapped_status, applied, handled FROM shipment_events
             WHERE awb_number = $1 AND raw_status = $2 AND status_time = $3",
        )
        .bind(awb_number)
        .bind(raw_status)
        .bind(status_time)
        .fetch_optional(self.pool)
        .await?;
        Ok(event)
    }
}

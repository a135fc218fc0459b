//! Order repository: checkout transaction, listings and status changes.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use aquamart_core::{
    OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, StatusSource, UserId,
};

use super::RepositoryError;
use crate::models::cart::Totals;
use crate::models::{Order, OrderItem, Pagination, ShippingAddress, StatusHistoryEntry};
use crate::models::order::NewOrderItem;

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_method, payment_status, \
                             subtotal, shipping_fee, total, shipping_address, razorpay_order_id, \
                             razorpay_payment_id, shipmozo_order_id, awb_number, courier_name, \
                             expected_delivery_date, created_at, updated_at";

/// A history row written together with an order change.
#[derive(Debug, Clone, Copy)]
pub struct HistoryNote<'a> {
    pub status: OrderStatus,
    pub note: Option<&'a str>,
    pub source: StatusSource,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a OrderNumber,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub totals: Totals,
    pub shipping_address: &'a ShippingAddress,
    pub items: &'a [NewOrderItem],
    /// Timeline entries, oldest first.
    pub history: &'a [HistoryNote<'a>],
}

/// A guarded status change. Applied only while the order is still in `from`.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub note: Option<&'a str>,
    pub source: StatusSource,
    pub payment_status: Option<PaymentStatus>,
    pub razorpay_payment_id: Option<&'a str>,
    /// Put the ordered quantities back on the shelf.
    pub restore_stock: bool,
    /// Courier event that caused the change, flagged applied in the same transaction.
    pub shipment_event_id: Option<i32>,
}

impl<'a> StatusChange<'a> {
    /// A plain status move with no payment or stock side effects.
    #[must_use]
    pub const fn new(
        from: OrderStatus,
        to: OrderStatus,
        note: Option<&'a str>,
        source: StatusSource,
    ) -> Self {
        Self {
            from,
            to,
            note,
            source,
            payment_status: None,
            razorpay_payment_id: None,
            restore_stock: false,
            shipment_event_id: None,
        }
    }
}

/// Courier details reported by ShipMozo.
#[derive(Debug, Clone, Default)]
pub struct TrackingUpdate<'a> {
    pub shipmozo_order_id: Option<&'a str>,
    pub awb_number: Option<&'a str>,
    pub courier_name: Option<&'a str>,
    pub expected_delivery_date: Option<&'a str>,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order in one transaction: insert the order, its items and
    /// history, take the stock and empty the buyer's cart.
    ///
    /// # Returns
    ///
    /// Returns `None` if the order number is already taken (nothing is written).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` with the product name when a
    /// product is inactive or no longer has enough stock.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(&self, new_order: &NewOrder<'_>) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders
                (order_number, user_id, status, payment_method, payment_status,
                 subtotal, shipping_fee, total, shipping_address)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (order_number) DO NOTHING
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(new_order.order_number.as_str())
        .bind(new_order.user_id)
        .bind(new_order.status)
        .bind(new_order.payment_method)
        .bind(PaymentStatus::Pending)
        .bind(new_order.totals.subtotal)
        .bind(new_order.totals.shipping_fee)
        .bind(new_order.totals.total)
        .bind(Json(new_order.shipping_address))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        for item in new_order.items {
            let taken = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = now()
                 WHERE id = $1 AND is_active AND stock >= $2",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if taken.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(item.product_name.clone()));
            }

            sqlx::query(
                "INSERT INTO order_items
                    (order_id, product_id, product_name, product_slug, image_url,
                     unit_price, quantity, line_total)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(&item.product_slug)
            .bind(item.image_url.as_deref())
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total())
            .execute(&mut *tx)
            .await?;
        }

        for entry in new_order.history {
            insert_history(&mut tx, order.id, entry).await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(new_order.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Line items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, product_name, product_slug, image_url,
                    unit_price, quantity, line_total
             FROM order_items
             WHERE order_id = $1
             ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Status timeline of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        let history = sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT status, note, source, created_at
             FROM order_status_history
             WHERE order_id = $1
             ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(history)
    }

    /// Orders newest first, optionally restricted to one customer and/or status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        user_id: Option<UserId>,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, user_id, status);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filters(&mut select, user_id, status);
        select.push(" ORDER BY created_at DESC, id DESC");
        select.push(" LIMIT ").push_bind(pagination.limit());
        select.push(" OFFSET ").push_bind(pagination.offset());

        let orders = select.build_query_as::<Order>().fetch_all(self.pool).await?;
        Ok((orders, total))
    }

    /// A customer's orders that are still moving.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1 AND status NOT IN ('delivered', 'cancelled', 'returned')
             ORDER BY created_at DESC
             LIMIT 10"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Find the order a courier event refers to: by AWB, then ShipMozo order
    /// id, then our order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_shipment(
        &self,
        awb_number: Option<&str>,
        reference: Option<&str>,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::text IS NOT NULL AND awb_number = $1)
                OR ($2::text IS NOT NULL AND (shipmozo_order_id = $2 OR order_number = upper($2)))
             ORDER BY (awb_number = $1) IS TRUE DESC,
                      (shipmozo_order_id = $2) IS TRUE DESC
             LIMIT 1"
        ))
        .bind(awb_number)
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Find an order by its Razorpay order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_razorpay_order_id(
        &self,
        razorpay_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE razorpay_order_id = $1"
        ))
        .bind(razorpay_order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Apply a guarded status change and record it in the timeline.
    ///
    /// # Returns
    ///
    /// Returns `None` if the order is no longer in `change.from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn apply_status_change(
        &self,
        id: OrderId,
        change: &StatusChange<'_>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                status = $3,
                payment_status = COALESCE($4, payment_status),
                razorpay_payment_id = COALESCE($5, razorpay_payment_id),
                updated_at = now()
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(change.from)
        .bind(change.to)
        .bind(change.payment_status)
        .bind(change.razorpay_payment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        if change.restore_stock {
            sqlx::query(
                "UPDATE products p SET stock = p.stock + oi.quantity, updated_at = now()
                 FROM order_items oi
                 WHERE oi.order_id = $1 AND p.id = oi.product_id",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        insert_history(
            &mut tx,
            id,
            &HistoryNote {
                status: change.to,
                note: change.note,
                source: change.source,
            },
        )
        .await?;

        if let Some(event_id) = change.shipment_event_id {
            sqlx::query(
                "UPDATE shipment_events SET applied = TRUE, handled = TRUE, order_id = $2
                 WHERE id = $1",
            )
            .bind(event_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Update payment fields without touching the order status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
        razorpay_payment_id: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                payment_status = $2,
                razorpay_payment_id = COALESCE($3, razorpay_payment_id),
                updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_status)
        .bind(razorpay_payment_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Store the Razorpay order created for this order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_razorpay_order_id(
        &self,
        id: OrderId,
        razorpay_order_id: &str,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET razorpay_order_id = $2, updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(razorpay_order_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Merge courier details; absent fields keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the AWB belongs to another order.
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_tracking(
        &self,
        id: OrderId,
        update: &TrackingUpdate<'_>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                shipmozo_order_id = COALESCE($2, shipmozo_order_id),
                awb_number = COALESCE($3, awb_number),
                courier_name = COALESCE($4, courier_name),
                expected_delivery_date = COALESCE($5, expected_delivery_date),
                updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.shipmozo_order_id)
        .bind(update.awb_number)
        .bind(update.courier_name)
        .bind(update.expected_delivery_date)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "AWB already assigned to another order"))?
        .ok_or(RepositoryError::NotFound)
    }
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: OrderId,
    entry: &HistoryNote<'_>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO order_status_history (order_id, status, note, source)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(entry.status)
    .bind(entry.note)
    .bind(entry.source)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    user_id: Option<UserId>,
    status: Option<OrderStatus>,
) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_sql() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut builder, Some(UserId::new(3)), Some(OrderStatus::Shipped));
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM orders WHERE TRUE AND user_id = $1 AND status = $2"
        );
    }

    #[test]
    fn test_status_change_defaults() {
        let change = StatusChange::new(
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            None,
            StatusSource::Seller,
        );
        assert!(!change.restore_stock);
        assert!(change.payment_status.is_none());
        assert!(change.shipment_event_id.is_none());
    }
}

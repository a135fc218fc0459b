//! Aggregate queries for the seller and customer dashboards.

use sqlx::PgPool;

use aquamart_core::UserId;

use super::RepositoryError;
use crate::models::Order;
use crate::models::dashboard::{CustomerTotals, DailyRevenue, SellerTotals, StatusCount};

/// Number of days covered by the revenue chart.
pub const REVENUE_WINDOW_DAYS: i32 = 30;

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Shop-wide headline numbers. Revenue counts paid orders only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn seller_totals(&self) -> Result<SellerTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, SellerTotals>(
            "SELECT
                (SELECT COUNT(*) FROM orders) AS orders,
                (SELECT COALESCE(SUM(total), 0) FROM orders WHERE payment_status = 'paid') AS revenue,
                (SELECT COUNT(*) FROM users WHERE role = 'customer') AS customers,
                (SELECT COUNT(*) FROM products WHERE is_active) AS products",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }

    /// Order counts per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(counts)
    }

    /// Booking counts per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bookings_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM bookings GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(counts)
    }

    /// The most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, order_number, user_id, status, payment_method, payment_status,
                    subtotal, shipping_fee, total, shipping_address, razorpay_order_id,
                    razorpay_payment_id, shipmozo_order_id, awb_number, courier_name,
                    expected_delivery_date, created_at, updated_at
             FROM orders
             ORDER BY created_at DESC, id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Paid revenue per day, including empty days, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_by_day(&self) -> Result<Vec<DailyRevenue>, RepositoryError> {
        let days = sqlx::query_as::<_, DailyRevenue>(
            "SELECT d::date AS day,
                    COALESCE(SUM(o.total), 0) AS revenue,
                    COUNT(o.id) AS orders
             FROM generate_series(CURRENT_DATE - ($1 - 1), CURRENT_DATE, INTERVAL '1 day') AS d
             LEFT JOIN orders o
                ON o.created_at::date = d::date AND o.payment_status = 'paid'
             GROUP BY d
             ORDER BY d",
        )
        .bind(REVENUE_WINDOW_DAYS)
        .fetch_all(self.pool)
        .await?;
        Ok(days)
    }

    /// A customer's headline numbers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customer_totals(&self, user_id: UserId) -> Result<CustomerTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, CustomerTotals>(
            "SELECT
                (SELECT COUNT(*) FROM orders WHERE user_id = $1) AS order_count,
                (SELECT COALESCE(SUM(total), 0) FROM orders
                    WHERE user_id = $1 AND payment_status = 'paid') AS total_spent,
                (SELECT COUNT(*) FROM notifications
                    WHERE user_id = $1 AND NOT is_read) AS unread_notifications",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }
}

//! Dashboard aggregates for sellers and customers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use aquamart_core::ProductId;

use super::{Booking, Order};

/// Low stock alert threshold (inclusive).
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Rows counted per status value.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Paid revenue for one day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

/// A product that is running out.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub stock: i32,
}

/// Headline numbers for the seller.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct SellerTotals {
    pub orders: i64,
    pub revenue: Decimal,
    pub customers: i64,
    pub products: i64,
}

/// `GET /api/seller/dashboard`.
#[derive(Debug, Clone, Serialize)]
pub struct SellerDashboard {
    pub totals: SellerTotals,
    pub orders_by_status: Vec<StatusCount>,
    pub bookings_by_status: Vec<StatusCount>,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<Order>,
    pub revenue_by_day: Vec<DailyRevenue>,
}

/// Headline numbers for a customer.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct CustomerTotals {
    pub order_count: i64,
    pub total_spent: Decimal,
    pub unread_notifications: i64,
}

/// `GET /api/account/dashboard`.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDashboard {
    #[serde(flatten)]
    pub totals: CustomerTotals,
    pub active_orders: Vec<Order>,
    pub upcoming_bookings: Vec<Booking>,
}

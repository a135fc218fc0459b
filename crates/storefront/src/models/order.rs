//! Orders, line item snapshots and status history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aquamart_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, StatusSource,
    UserId,
};

use super::ShippingAddress;

/// An order header.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    #[sqlx(json)]
    pub shipping_address: ShippingAddress,
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipmozo_order_id: Option<String>,
    pub awb_number: Option<String>,
    pub courier_name: Option<String>,
    pub expected_delivery_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the customer still owes an online payment.
    #[must_use]
    pub fn awaits_online_payment(&self) -> bool {
        self.payment_method == PaymentMethod::Online
            && self.payment_status != PaymentStatus::Paid
            && self.status == OrderStatus::Pending
    }
}

/// A purchased line, priced at checkout time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// One status change.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub source: StatusSource,
    pub created_at: DateTime<Utc>,
}

/// Order with its items and timeline, as returned by `GET /api/orders/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<StatusHistoryEntry>,
}

/// Line data written into `order_items` at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Request body for `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Query parameters for order listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Request body for `PATCH /api/seller/orders/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request body for `POST /api/seller/orders/{id}/ship`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipRequest {
    /// Package weight in kilograms.
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    /// Package dimensions in centimetres (length, breadth, height).
    #[serde(default)]
    pub dimensions_cm: Option<[u32; 3]>,
    /// Courier chosen by the seller, auto-assigned when absent.
    #[serde(default)]
    pub courier_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_defaults_to_cod() {
        let body: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "address": {
                "name": "Asha Rao",
                "phone": "9845012345",
                "line1": "12, 4th Cross",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pincode": "560038"
            }
        }))
        .unwrap();
        assert_eq!(body.payment_method, PaymentMethod::Cod);
    }

    #[test]
    fn test_new_order_item_line_total() {
        let item = NewOrderItem {
            product_id: ProductId::new(1),
            product_name: "Carbon filter".to_string(),
            product_slug: "carbon-filter".to_string(),
            image_url: None,
            unit_price: Decimal::new(49950, 2),
            quantity: 2,
        };
        assert_eq!(item.line_total(), Decimal::new(99900, 2));
    }

    #[test]
    fn test_status_update_request() {
        let body: StatusUpdateRequest =
            serde_json::from_str(r#"{"status": "out_for_delivery"}"#).unwrap();
        assert_eq!(body.status, OrderStatus::OutForDelivery);
        assert!(body.note.is_none());
    }
}

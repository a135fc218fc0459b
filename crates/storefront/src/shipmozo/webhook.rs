//! Incoming `ShipMozo` status webhooks.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use aquamart_core::OrderStatus;

/// Webhook body. Unknown fields are kept in the raw payload, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentWebhook {
    /// `ShipMozo` order id, or our order number echoed back.
    #[serde(default, deserialize_with = "optional_stringly")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "optional_stringly")]
    pub awb_number: Option<String>,
    #[serde(default, alias = "courier_name")]
    pub courier: Option<String>,
    #[serde(alias = "status")]
    pub current_status: String,
    #[serde(default)]
    pub status_time: Option<String>,
    #[serde(default)]
    pub expected_delivery_date: Option<String>,
}

impl ShipmentWebhook {
    /// AWB with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn awb(&self) -> Option<&str> {
        non_blank(self.awb_number.as_deref())
    }

    /// Order reference with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        non_blank(self.order_id.as_deref())
    }

    /// Idempotency key part for the event time. Blank when not reported.
    #[must_use]
    pub fn status_time(&self) -> &str {
        self.status_time.as_deref().map_or("", str::trim)
    }

    /// The order status this event maps to, if any.
    #[must_use]
    pub fn mapped_status(&self) -> Option<OrderStatus> {
        map_status(&self.current_status)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn optional_stringly<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Lowercase, treat `_` and `-` as spaces and collapse runs of whitespace.
#[must_use]
pub fn normalize_status(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a courier status string to an order status.
///
/// Returns `None` for statuses that are recorded but do not move the order.
#[must_use]
pub fn map_status(raw: &str) -> Option<OrderStatus> {
    let status = normalize_status(raw);

    if status == "returned" || status == "rto" || status.starts_with("rto ") {
        return Some(OrderStatus::Returned);
    }

    match status.as_str() {
        "booked" | "manifested" | "pickup scheduled" | "pickup pending" => {
            Some(OrderStatus::Processing)
        }
        "picked up" | "shipped" | "dispatched" => Some(OrderStatus::Shipped),
        "in transit" | "intransit" | "reached hub" => Some(OrderStatus::InTransit),
        "out for delivery" => Some(OrderStatus::OutForDelivery),
        "delivered" => Some(OrderStatus::Delivered),
        "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

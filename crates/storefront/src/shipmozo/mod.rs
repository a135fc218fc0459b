//! `ShipMozo` shipping aggregator integration.
//!
//! Outbound: push orders, assign a courier, track by AWB. Every call sends
//! the `public-key` and `private-key` headers; responses use the
//! `{result, message, data}` envelope where anything but `result == "1"` is
//! an API error.
//!
//! Inbound: status webhooks, see [`webhook`].

pub mod types;
pub mod webhook;

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use aquamart_core::PaymentMethod;

use crate::config::ShipMozoConfig;
use crate::models::{Order, OrderItem, ShipRequest};

use types::{CourierAssignment, Envelope, ProductDetail, PushOrder, PushOrderData, TrackingInfo};

const SHIPMOZO_API_BASE: &str = "https://shipping-api.com/app/api/v1";

/// Default parcel weight when the seller does not give one.
pub const DEFAULT_WEIGHT_GRAMS: u32 = 1000;

/// Default parcel dimensions (cm) when the seller does not give them.
pub const DEFAULT_DIMENSIONS_CM: [u32; 3] = [30, 30, 30];

/// Errors that can occur when interacting with `ShipMozo`.
#[derive(Debug, Error)]
pub enum ShipMozoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `ShipMozo` answered with `result != 1`.
    #[error("ShipMozo API error: {0}")]
    Api(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("ShipMozo configuration error: {0}")]
    Config(String),
}

/// `ShipMozo` API client.
#[derive(Clone)]
pub struct ShipMozoClient {
    inner: Arc<ShipMozoClientInner>,
}

struct ShipMozoClientInner {
    client: reqwest::Client,
    base_url: String,
    warehouse_id: Option<String>,
}

impl std::fmt::Debug for ShipMozoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipMozoClient")
            .field("base_url", &self.inner.base_url)
            .field("warehouse_id", &self.inner.warehouse_id)
            .finish_non_exhaustive()
    }
}

impl ShipMozoClient {
    /// Create a new `ShipMozo` client.
    ///
    /// # Errors
    ///
    /// Returns `ShipMozoError::Config` if a key is not a valid header value.
    pub fn new(config: &ShipMozoConfig) -> Result<Self, ShipMozoError> {
        Self::with_base_url(config, SHIPMOZO_API_BASE)
    }

    /// Create a client against a different API host (tests, mocks).
    ///
    /// # Errors
    ///
    /// Returns `ShipMozoError::Config` if a key is not a valid header value.
    pub fn with_base_url(config: &ShipMozoConfig, base_url: &str) -> Result<Self, ShipMozoError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "public-key",
            HeaderValue::from_str(&config.public_key)
                .map_err(|_| ShipMozoError::Config("invalid public key".to_string()))?,
        );
        let mut private_key = HeaderValue::from_str(config.private_key.expose_secret())
            .map_err(|_| ShipMozoError::Config("invalid private key".to_string()))?;
        private_key.set_sensitive(true);
        headers.insert("private-key", private_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShipMozoClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_owned(),
                warehouse_id: config.warehouse_id.clone(),
            }),
        })
    }

    /// Create the order at `ShipMozo`. Returns their order id.
    ///
    /// # Errors
    ///
    /// Returns `ShipMozoError::Api` if `ShipMozo` rejects the order.
    #[instrument(skip(self, order, items, request), fields(order_number = %order.order_number))]
    pub async fn push_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        customer_email: Option<&str>,
        request: &ShipRequest,
    ) -> Result<PushOrderData, ShipMozoError> {
        let body = build_push_order(
            order,
            items,
            customer_email,
            request,
            self.inner.warehouse_id.clone(),
        );
        let data: PushOrderData = self.post("push-order", &body).await?;
        debug!(shipmozo_order_id = %data.order_id, "order pushed to ShipMozo");
        Ok(data)
    }

    /// Assign a courier. Without `courier_id` `ShipMozo` picks one.
    ///
    /// # Errors
    ///
    /// Returns `ShipMozoError::Api` if no courier could be assigned.
    #[instrument(skip(self))]
    pub async fn assign_courier(
        &self,
        shipmozo_order_id: &str,
        courier_id: Option<&str>,
    ) -> Result<CourierAssignment, ShipMozoError> {
        #[derive(Serialize)]
        struct AssignBody<'a> {
            order_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            courier_id: Option<&'a str>,
        }

        let path = if courier_id.is_some() {
            "assign-courier"
        } else {
            "auto-assign-order"
        };
        let assignment: CourierAssignment = self
            .post(
                path,
                &AssignBody {
                    order_id: shipmozo_order_id,
                    courier_id,
                },
            )
            .await?;
        debug!(awb = %assignment.awb_number, "courier assigned");
        Ok(assignment)
    }

    /// Current tracking state of a shipment.
    ///
    /// # Errors
    ///
    /// Returns `ShipMozoError::Api` for unknown AWBs.
    #[instrument(skip(self))]
    pub async fn track(&self, awb_number: &str) -> Result<TrackingInfo, ShipMozoError> {
        let response = self
            .inner
            .client
            .get(format!("{}/track-order", self.inner.base_url))
            .query(&[("awb_number", awb_number)])
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ShipMozoError> {
        let response = self
            .inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .json(body)
            .send()
            .await?;
        unwrap_envelope(response).await
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ShipMozoError> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            status = %status,
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "failed to parse ShipMozo response"
        );
        ShipMozoError::Parse(e.to_string())
    })?;

    if !envelope.result {
        return Err(ShipMozoError::Api(if envelope.message.is_empty() {
            format!("request failed with HTTP {status}")
        } else {
            envelope.message
        }));
    }

    envelope
        .data
        .ok_or_else(|| ShipMozoError::Parse("missing data".to_string()))
}

/// Build the `push-order` body for one of our orders.
#[must_use]
pub fn build_push_order(
    order: &Order,
    items: &[OrderItem],
    customer_email: Option<&str>,
    request: &ShipRequest,
    warehouse_id: Option<String>,
) -> PushOrder {
    let address = &order.shipping_address;
    let [length, width, height] = request.dimensions_cm.unwrap_or(DEFAULT_DIMENSIONS_CM);
    let (payment_type, cod_amount) = match order.payment_method {
        PaymentMethod::Cod => ("COD", order.total),
        PaymentMethod::Online => ("PREPAID", Decimal::ZERO),
    };

    PushOrder {
        order_id: order.order_number.clone(),
        order_date: order.created_at.format("%Y-%m-%d").to_string(),
        order_type: "NON ESSENTIALS",
        consignee_name: address.name.clone(),
        consignee_phone: address.phone.as_str().to_owned(),
        consignee_email: customer_email.map(str::to_owned),
        consignee_address_line_one: address.line1.clone(),
        consignee_address_line_two: address.line2.clone(),
        consignee_pin_code: address.pincode.as_str().to_owned(),
        consignee_city: address.city.clone(),
        consignee_state: address.state.clone(),
        product_detail: items
            .iter()
            .map(|item| ProductDetail {
                name: item.product_name.clone(),
                sku_number: item.product_slug.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price.to_string(),
                product_category: "Water purifiers".to_string(),
            })
            .collect(),
        payment_type,
        cod_amount: cod_amount.to_string(),
        weight: request.weight_kg.map_or(DEFAULT_WEIGHT_GRAMS, kilograms_to_grams),
        length,
        width,
        height,
        warehouse_id,
    }
}

fn kilograms_to_grams(kg: Decimal) -> u32 {
    use rust_decimal::prelude::ToPrimitive;
    (kg * Decimal::from(1000))
        .round()
        .to_u32()
        .filter(|g| *g > 0)
        .unwrap_or(DEFAULT_WEIGHT_GRAMS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    use aquamart_core::{OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};

    use crate::models::ShippingAddress;

    fn order(method: PaymentMethod) -> Order {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "phone": "+91 98450 12345",
            "line1": "12, 4th Cross",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560038"
        }))
        .unwrap();
        Order {
            id: OrderId::new(42),
            order_number: "AQ261016000042".to_string(),
            user_id: UserId::new(7),
            status: OrderStatus::Confirmed,
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            subtotal: Decimal::new(12999, 0),
            shipping_fee: Decimal::ZERO,
            total: Decimal::new(12999, 0),
            shipping_address: address,
            razorpay_order_id: None,
            razorpay_payment_id: None,
            shipmozo_order_id: None,
            awb_number: None,
            courier_name: None,
            expected_delivery_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn items() -> Vec<OrderItem> {
        vec![OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(42),
            product_id: ProductId::new(3),
            product_name: "RO+UV Purifier".to_string(),
            product_slug: "ro-uv-purifier".to_string(),
            image_url: None,
            unit_price: Decimal::new(12999, 0),
            quantity: 1,
            line_total: Decimal::new(12999, 0),
        }]
    }

    #[test]
    fn test_push_order_cod_defaults() {
        let body = build_push_order(
            &order(PaymentMethod::Cod),
            &items(),
            Some("asha@example.com"),
            &ShipRequest::default(),
            None,
        );
        assert_eq!(body.payment_type, "COD");
        assert_eq!(body.cod_amount, "12999");
        assert_eq!(body.consignee_phone, "9845012345");
        assert_eq!(body.weight, DEFAULT_WEIGHT_GRAMS);
        assert_eq!([body.length, body.width, body.height], DEFAULT_DIMENSIONS_CM);

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("warehouse_id").is_none());
        assert_eq!(json["product_detail"][0]["sku_number"], "ro-uv-purifier");
    }

    #[test]
    fn test_push_order_prepaid_with_package() {
        let request = ShipRequest {
            weight_kg: Some(Decimal::new(125, 1)),
            dimensions_cm: Some([50, 30, 40]),
            courier_id: None,
        };
        let body = build_push_order(
            &order(PaymentMethod::Online),
            &items(),
            None,
            &request,
            Some("WH-1".to_string()),
        );
        assert_eq!(body.payment_type, "PREPAID");
        assert_eq!(body.cod_amount, "0");
        assert_eq!(body.weight, 12_500);
        assert_eq!(body.length, 50);
        assert_eq!(body.warehouse_id.as_deref(), Some("WH-1"));
    }

    #[test]
    fn test_kilograms_to_grams_rejects_zero() {
        assert_eq!(kilograms_to_grams(Decimal::ZERO), DEFAULT_WEIGHT_GRAMS);
        assert_eq!(kilograms_to_grams(Decimal::new(5, 1)), 500);
    }
}

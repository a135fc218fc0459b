//! Razorpay request and response types.

use serde::{Deserialize, Serialize};

/// Body for `POST /v1/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest<'a> {
    /// Amount in paise.
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub notes: OrderNotes<'a>,
}

/// Free-form notes attached to a Razorpay order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderNotes<'a> {
    pub order_number: &'a str,
}

/// A Razorpay order.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

/// Webhook body. Only the fields used are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<EntityWrapper<PaymentEntity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

/// A payment as embedded in webhook events.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub status: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl WebhookEvent {
    /// The payment entity, if this event carries one.
    #[must_use]
    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payment_captured() {
        let json = r#"{
            "entity": "event",
            "account_id": "acc_BFQ7uQEaa7j2z7",
            "event": "payment.captured",
            "contains": ["payment"],
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_29QQoUBi66xm2f",
                        "entity": "payment",
                        "amount": 1299900,
                        "currency": "INR",
                        "status": "captured",
                        "order_id": "order_9A33XWu170gUtm",
                        "method": "upi"
                    }
                }
            },
            "created_at": 1567674606
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, "payment.captured");
        let payment = event.payment().unwrap();
        assert_eq!(payment.order_id.as_deref(), Some("order_9A33XWu170gUtm"));
        assert_eq!(payment.amount, 1_299_900);
    }

    #[test]
    fn test_webhook_without_payment() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"event": "refund.created", "payload": {}}"#).unwrap();
        assert!(event.payment().is_none());
    }
}

//! Razorpay checkout request and response bodies.

use serde::{Deserialize, Serialize};

use aquamart_core::OrderId;

/// Request body for `POST /api/payments/create-order`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

/// What the browser needs to open Razorpay checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrder {
    pub key_id: String,
    pub razorpay_order_id: String,
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub order_id: OrderId,
    pub order_number: String,
}

/// Request body for `POST /api/payments/verify`, as returned by checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Request body for `POST /api/orders/{id}/cancel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_shape() {
        let body: VerifyPaymentRequest = serde_json::from_str(
            r#"{
                "razorpay_order_id": "order_9A33XWu170gUtm",
                "razorpay_payment_id": "pay_29QQoUBi66xm2f",
                "razorpay_signature": "9ef4dffbfd84f1318f6739a3ce19f9d85851857ae648f114332d8401e0949a3d"
            }"#,
        )
        .unwrap();
        assert_eq!(body.razorpay_payment_id, "pay_29QQoUBi66xm2f");
    }

    #[test]
    fn test_cancel_reason_optional() {
        let body: CancelRequest = serde_json::from_str("{}").unwrap();
        assert!(body.reason.is_none());
    }
}

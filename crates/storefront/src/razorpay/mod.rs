//! Razorpay payment gateway integration.
//!
//! - Order creation over the REST API (basic auth with key id and secret)
//! - Checkout signature verification: HMAC-SHA256 of `order_id|payment_id`
//! - Webhook signature verification: HMAC-SHA256 of the raw body

mod error;
pub mod types;

pub use error::RazorpayError;

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument};

use aquamart_core::Price;

use crate::config::RazorpayConfig;

use error::ApiErrorResponse;
use types::{CreateOrderRequest, OrderNotes, RazorpayOrder};

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.inner.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self::with_base_url(config, RAZORPAY_API_BASE)
    }

    /// Create a client against a different API host (tests, mocks).
    #[must_use]
    pub fn with_base_url(config: &RazorpayConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(RazorpayClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        }
    }

    /// Public key id, handed to the browser checkout.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Create a Razorpay order for an amount in rupees.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidAmount` if the amount has sub-paise
    /// precision or is negative, and API errors otherwise.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        receipt: &str,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let paise = Price::inr(amount)
            .to_minor_units()
            .map_err(|e| RazorpayError::InvalidAmount(e.to_string()))?;

        let body = CreateOrderRequest {
            amount: paise,
            currency: "INR",
            receipt,
            notes: OrderNotes {
                order_number: receipt,
            },
        };

        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.base_url))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| RazorpayError::Parse(e.to_string()))?;

        debug!(razorpay_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    /// Verify the signature returned by the browser checkout.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_payment_signature(
        &self,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        let message = format!("{razorpay_order_id}|{razorpay_payment_id}");
        verify_hmac(&self.inner.key_secret, message.as_bytes(), signature)
    }

    /// Verify the `X-Razorpay-Signature` header of a webhook.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::WebhookNotConfigured` without a webhook secret,
    /// `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), RazorpayError> {
        let secret = self
            .inner
            .webhook_secret
            .as_ref()
            .ok_or(RazorpayError::WebhookNotConfigured)?;
        verify_hmac(secret, body, signature)
    }
}

async fn handle_error_status(status: reqwest::StatusCode, response: reqwest::Response) -> RazorpayError {
    let body = response.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return RazorpayError::Unauthorized(body.chars().take(200).collect());
    }

    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(err) => RazorpayError::Api {
            code: err.error.code,
            description: err.error.description,
        },
        Err(_) => RazorpayError::Api {
            code: status.as_u16().to_string(),
            description: body.chars().take(200).collect(),
        },
    }
}

/// Hex HMAC-SHA256 of `message` under `secret`.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` if the key is rejected.
pub fn sign(secret: &str, message: &[u8]) -> Result<String, RazorpayError> {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return Err(RazorpayError::InvalidSignature);
    };
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hmac(secret: &SecretString, message: &[u8], signature: &str) -> Result<(), RazorpayError> {
    let expected = sign(secret.expose_secret(), message)?;
    if constant_time_compare(&expected, signature.trim()) {
        Ok(())
    } else {
        Err(RazorpayError::InvalidSignature)
    }
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(webhook_secret: Option<&str>) -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_1DP5mmOlF5G5ag".to_string(),
            key_secret: SecretString::from("thisisasecretkey".to_string()),
            webhook_secret: webhook_secret.map(|s| SecretString::from(s.to_string())),
        })
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?").expect("sign"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_payment_signature() {
        let client = client(None);
        let signature = sign("thisisasecretkey", b"order_9A33XWu170gUtm|pay_29QQoUBi66xm2f").expect("sign");

        assert!(
            client
                .verify_payment_signature("order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", &signature)
                .is_ok()
        );
        assert!(matches!(
            client.verify_payment_signature("order_9A33XWu170gUtm", "pay_other", &signature),
            Err(RazorpayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_webhook_signature() {
        let client = client(Some("whsec_aquamart"));
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("whsec_aquamart", body).expect("sign");

        assert!(client.verify_webhook_signature(body, &signature).is_ok());
        assert!(matches!(
            client.verify_webhook_signature(b"{}", &signature),
            Err(RazorpayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_sign_accepts_empty_and_long_keys() {
        let long_key = "k".repeat(200);
        for key in ["", long_key.as_str()] {
            let signature = sign(key, b"payload").expect("sign");
            assert_eq!(signature.len(), 64);
            assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_webhook_requires_secret() {
        assert!(matches!(
            client(None).verify_webhook_signature(b"{}", "sig"),
            Err(RazorpayError::WebhookNotConfigured)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", client(None));
        assert!(debug.contains("rzp_test_1DP5mmOlF5G5ag"));
        assert!(!debug.contains("thisisasecretkey"));
    }
}

//! Razorpay-related errors.

use thiserror::Error;

/// Errors that can occur when interacting with Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay API returned an error.
    #[error("API error ({code}): {description}")]
    Api {
        /// Error code from the API, e.g. `BAD_REQUEST_ERROR`.
        code: String,
        /// Human readable description.
        description: String,
    },

    /// Credentials rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Amount cannot be expressed in paise.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Signature did not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// Webhook secret is not configured.
    #[error("webhook secret not configured")]
    WebhookNotConfigured,
}

/// Error envelope returned by the Razorpay API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    pub code: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "The amount must be atleast INR 1.00",
                "source": "business",
                "step": "payment_initiation"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.error.code, "BAD_REQUEST_ERROR");
        assert!(response.error.description.starts_with("The amount"));
    }

    #[test]
    fn test_error_display() {
        let err = RazorpayError::Api {
            code: "BAD_REQUEST_ERROR".to_string(),
            description: "receipt too long".to_string(),
        };
        assert_eq!(err.to_string(), "API error (BAD_REQUEST_ERROR): receipt too long");
    }
}

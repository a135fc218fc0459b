//! Razorpay payment route handlers.
//!
//! The browser opens Razorpay checkout with the order created here, then
//! posts the signed result back to `/verify`. The webhook covers payments
//! whose browser callback never arrives.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use tracing::instrument;

use crate::error::{ApiJson, ApiResponse, AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CreatePaymentRequest, Order, PaymentOrder, VerifyPaymentRequest};
use crate::razorpay::{RazorpayError, types::WebhookEvent};
use crate::routes::orders::order_service;
use crate::state::AppState;

/// Header carrying the webhook body signature.
const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Create the Razorpay order for one of the caller's unpaid online orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<CreatePaymentRequest>,
) -> Result<ApiResponse<PaymentOrder>> {
    let payment = order_service(&state)
        .start_payment(user.id, request.order_id, state.razorpay())
        .await?;
    Ok(ApiResponse::ok(payment))
}

/// Verify the checkout signature and confirm the order.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<VerifyPaymentRequest>,
) -> Result<ApiResponse<Order>> {
    let order = order_service(&state)
        .verify_payment(user.id, &request, state.razorpay())
        .await?;

    add_breadcrumb(
        "payment",
        "Payment verified",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    Ok(ApiResponse::ok(order).with_message("Payment successful"))
}

/// Razorpay webhook.
///
/// The signature covers the raw body, so it is checked before parsing.
/// Events that do not concern an order are acknowledged with 200.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<()>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature".to_string()))?;

    state
        .razorpay()
        .verify_webhook_signature(&body, signature)
        .map_err(|e| match e {
            RazorpayError::WebhookNotConfigured => {
                tracing::warn!("Razorpay webhook received but RAZORPAY_WEBHOOK_SECRET is not set");
                AppError::NotFound("Not found".to_string())
            }
            other => {
                tracing::warn!(error = %other, "Razorpay webhook signature rejected");
                AppError::Unauthorized("Invalid signature".to_string())
            }
        })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    let outcome = order_service(&state).handle_payment_event(&event).await?;
    tracing::info!(event = %event.event, outcome, "Razorpay webhook processed");
    Ok(ApiResponse::message(outcome))
}

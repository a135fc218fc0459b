//! `ShipMozo` courier webhooks.
//!
//! Answers 200 for every well-formed event, matched or not, so the courier
//! does not retry forever. Malformed bodies get 400 and a bad token 401.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use aquamart_core::OrderStatus;

use crate::error::{ApiResponse, AppError, Result};
use crate::razorpay::constant_time_compare;
use crate::routes::orders::order_service;
use crate::services::orders::ShipmentOutcome;
use crate::shipmozo::webhook::ShipmentWebhook;
use crate::state::AppState;

/// Header carrying the shared webhook token.
pub const TOKEN_HEADER: &str = "x-webhook-token";

/// Query string fallback for couriers that cannot set headers.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Whether the request carries the configured token. No token configured
/// means every request is accepted.
#[must_use]
pub fn token_matches(expected: Option<&str>, headers: &HeaderMap, query: &TokenQuery) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query.token.as_deref())
        .is_some_and(|given| constant_time_compare(expected, given.trim()))
}

/// Parse the body, keeping the raw JSON for the event log.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for invalid JSON or a missing status.
pub fn parse_event(body: &[u8]) -> Result<(ShipmentWebhook, Value)> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))?;
    let hook = ShipmentWebhook::deserialize(&payload)
        .map_err(|e| AppError::BadRequest(format!("Invalid shipment event: {e}")))?;
    Ok((hook, payload))
}

/// Shipment status push from `ShipMozo`.
#[instrument(skip_all)]
pub async fn shipment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Result<ApiResponse<()>> {
    let expected = state
        .config()
        .shipmozo
        .webhook_token
        .as_ref()
        .map(|token| token.expose_secret());
    if !token_matches(expected, &headers, &query) {
        tracing::warn!("shipment webhook with a bad token");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    let (hook, payload) = parse_event(&body)?;
    tracing::info!(
        awb = hook.awb(),
        reference = hook.reference(),
        status = %hook.current_status,
        "shipment webhook received"
    );

    let outcome = order_service(&state)
        .apply_shipment_event(&hook, &payload)
        .await?;
    if outcome == ShipmentOutcome::Applied(OrderStatus::Cancelled) {
        // Stock went back on the shelf.
        state.catalog_cache().invalidate_all().await;
    }

    Ok(ApiResponse::message(outcome.message()))
}

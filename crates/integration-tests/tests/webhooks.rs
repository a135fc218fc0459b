//! Webhook gatekeeping: signatures, shared tokens and payload validation
//! are all checked before any database work.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use serde_json::json;

use aquamart_core::OrderStatus;
use aquamart_integration_tests::{
    RAZORPAY_WEBHOOK_SECRET, SHIPMOZO_WEBHOOK_TOKEN, post_json, send_json, test_app, test_config,
};
use aquamart_storefront::razorpay::sign;
use aquamart_storefront::routes::webhooks::{TOKEN_HEADER, TokenQuery, parse_event, token_matches};

fn razorpay_webhook(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/payments/webhook").header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-razorpay-signature", signature);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn shipment_webhook(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

// ============================================================================
// Razorpay
// ============================================================================

#[tokio::test]
async fn test_razorpay_webhook_requires_signature() {
    let (status, body) = send_json(
        test_app(test_config()),
        razorpay_webhook(r#"{"event":"payment.captured"}"#, None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing signature");
}

#[tokio::test]
async fn test_razorpay_webhook_rejects_bad_signature() {
    let payload = r#"{"event":"payment.captured"}"#;
    let forged = sign("not-the-secret", payload.as_bytes()).expect("sign");
    let (status, body) =
        send_json(test_app(test_config()), razorpay_webhook(payload, Some(&forged))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid signature");
}

#[tokio::test]
async fn test_razorpay_webhook_signature_covers_raw_body() {
    let signed = r#"{"event":"payment.captured"}"#;
    let signature = sign(RAZORPAY_WEBHOOK_SECRET, signed.as_bytes()).expect("sign");
    let tampered = r#"{"event": "payment.captured"}"#;
    let (status, _) =
        send_json(test_app(test_config()), razorpay_webhook(tampered, Some(&signature))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_razorpay_webhook_without_payment_is_acknowledged() {
    let payload = json!({"event": "refund.processed", "payload": {}}).to_string();
    let signature = sign(RAZORPAY_WEBHOOK_SECRET, payload.as_bytes()).expect("sign");
    let (status, body) =
        send_json(test_app(test_config()), razorpay_webhook(&payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Event ignored");
}

#[tokio::test]
async fn test_razorpay_webhook_signed_garbage_is_bad_request() {
    let payload = "not json";
    let signature = sign(RAZORPAY_WEBHOOK_SECRET, payload.as_bytes()).expect("sign");
    let (status, _) =
        send_json(test_app(test_config()), razorpay_webhook(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_razorpay_webhook_unconfigured_is_not_found() {
    let mut config = test_config();
    config.razorpay.webhook_secret = None;
    let payload = r#"{"event":"payment.captured"}"#;
    let signature = sign(RAZORPAY_WEBHOOK_SECRET, payload.as_bytes()).expect("sign");
    let (status, _) = send_json(test_app(config), razorpay_webhook(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// ShipMozo
// ============================================================================

#[tokio::test]
async fn test_shipment_webhook_rejects_wrong_token() {
    let payload = json!({"awb_number": "AWB1", "current_status": "Delivered"}).to_string();

    for uri in ["/api/webhooks/shipmozo", "/api/webhooks/shipmojo"] {
        let (status, body) = send_json(
            test_app(test_config()),
            shipment_webhook(uri, &payload, Some("wrong-token")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
    }
}

#[tokio::test]
async fn test_shipment_webhook_rejects_missing_token() {
    let payload = json!({"awb_number": "AWB1", "current_status": "Delivered"}).to_string();
    let (status, _) = send_json(
        test_app(test_config()),
        shipment_webhook("/api/webhooks/shipmozo", &payload, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shipment_webhook_validates_body_after_token() {
    let (status, _) = send_json(
        test_app(test_config()),
        shipment_webhook("/api/webhooks/shipmozo", "{not json", Some(SHIPMOZO_WEBHOOK_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        test_app(test_config()),
        shipment_webhook(
            "/api/webhooks/shipmozo",
            r#"{"awb_number":"AWB1"}"#,
            Some(SHIPMOZO_WEBHOOK_TOKEN),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_shipment_webhook_accepts_token_in_query() {
    let request = post_json(
        &format!("/api/webhooks/shipmozo?token={SHIPMOZO_WEBHOOK_TOKEN}"),
        "{not json",
    );
    let (status, _) = send_json(test_app(test_config()), request).await;

    // Past the token check, stopped by the body.
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_token_matches_prefers_header() {
    let mut headers = HeaderMap::new();
    headers.insert(TOKEN_HEADER, HeaderValue::from_static(" secret "));
    let query = TokenQuery {
        token: Some("other".to_string()),
    };

    assert!(token_matches(Some("secret"), &headers, &query));
    assert!(!token_matches(Some("other"), &headers, &query));
    assert!(token_matches(None, &HeaderMap::new(), &TokenQuery::default()));
    assert!(!token_matches(Some("secret"), &HeaderMap::new(), &TokenQuery::default()));
}

#[test]
fn test_parse_event_keeps_raw_payload() {
    let body = json!({
        "order_id": 98213,
        "awb_number": " 1490823410 ",
        "courier_name": "Delhivery",
        "status": "OUT_FOR_DELIVERY",
        "status_time": "2026-10-12 14:03:00",
        "extra": {"hub": "Pune"}
    })
    .to_string();

    let (hook, raw) = parse_event(body.as_bytes()).expect("valid event");
    assert_eq!(hook.reference(), Some("98213"));
    assert_eq!(hook.awb(), Some("1490823410"));
    assert_eq!(hook.courier.as_deref(), Some("Delhivery"));
    assert_eq!(hook.mapped_status(), Some(OrderStatus::OutForDelivery));
    assert_eq!(raw["extra"]["hub"], "Pune");
}

//! Router-level tests for the API surface that needs no database:
//! health, auth guards, request validation and middleware headers.

#![allow(clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};

use aquamart_integration_tests::{
    FRONTEND_ORIGIN, get, post_json, send, send_json, test_app, test_config,
};

#[tokio::test]
async fn test_health_is_ok() {
    let response = send(test_app(test_config()), get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cart_requires_login() {
    let (status, body) = send_json(test_app(test_config()), get("/api/cart")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please log in");
}

#[tokio::test]
async fn test_seller_routes_require_login() {
    for uri in ["/api/seller/dashboard", "/api/seller/orders", "/api/seller/bookings"] {
        let (status, body) = send_json(test_app(test_config()), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
    }
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let request = post_json("/api/orders", r#"{"payment_method":"cod"}"#);
    let (status, _) = send_json(test_app(test_config()), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = post_json("/api/auth/login", r#"{"email": "a@b.in", "password": "#);
    let (status, body) = send_json(test_app(test_config()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_missing_json_content_type_is_rejected() {
    let request = Request::post("/api/auth/register")
        .body(Body::from(r#"{"name":"Asha"}"#))
        .expect("request");
    let (status, body) = send_json(test_app(test_config()), request).await;

    assert!(status.is_client_error(), "got {status}");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_security_headers_present() {
    let response = send(test_app(test_config()), get("/api/cart")).await;
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
}

#[tokio::test]
async fn test_hsts_behind_https_proxy() {
    let request = Request::get("/health")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .expect("request");
    let response = send(test_app(test_config()), request).await;
    assert!(response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let request = Request::get("/health")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .expect("request");
    let response = send(test_app(test_config()), request).await;
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");

    let response = send(test_app(test_config()), get("/health")).await;
    let generated = response.headers()["x-request-id"].to_str().expect("ascii");
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_with_credentials() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/cart/items")
        .header(header::ORIGIN, FRONTEND_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("request");
    let response = send(test_app(test_config()), request).await;
    let headers = response.headers();

    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_never_reflects_other_origins() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .expect("request");
    let response = send(test_app(test_config()), request).await;

    if let Some(origin) = response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        assert_eq!(origin, FRONTEND_ORIGIN);
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(test_app(test_config()), get("/api/does-not-exist")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

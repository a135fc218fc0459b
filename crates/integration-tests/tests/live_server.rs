//! Customer flows against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`aq-cli migrate`)
//! - The storefront running (`cargo run -p aquamart-storefront`)
//!
//! Run with: `cargo test -p aquamart-integration-tests -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the storefront API (configurable via environment).
fn base_url() -> String {
    std::env::var("AQUAMART_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a fresh customer; the client keeps the session cookie.
async fn register(client: &Client) -> Value {
    let email = format!("test-{}@aquamart.test", Uuid::new_v4().simple());
    let resp = client
        .post(format!("{}/api/auth/register", base_url()))
        .json(&json!({
            "name": "Test Customer",
            "email": email,
            "phone": "9876543210",
            "password": "correct horse battery 42"
        }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body["success"], true);
    body["data"].clone()
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_me_logout() {
    let client = client();
    let user = register(&client).await;
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());

    let me: Value = client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("JSON body");
    assert_eq!(me["data"]["id"], user["id"]);

    let resp = client
        .post(format!("{}/api/auth/logout", base_url()))
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .expect("me after logout");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_duplicate_registration_conflicts() {
    let client = client();
    let user = register(&client).await;

    let resp = Client::new()
        .post(format!("{}/api/auth/register", base_url()))
        .json(&json!({
            "name": "Someone Else",
            "email": user["email"],
            "phone": "9876543211",
            "password": "another long password 7"
        }))
        .send()
        .await
        .expect("register again");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_new_customer_has_empty_cart() {
    let client = client();
    register(&client).await;

    let body: Value = client
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .expect("cart")
        .json()
        .await
        .expect("JSON body");

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_adding_unknown_product_is_not_found() {
    let client = client();
    register(&client).await;

    let resp = client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({"product_id": 2_000_000_000, "quantity": 1}))
        .send()
        .await
        .expect("add to cart");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_customer_cannot_open_seller_dashboard() {
    let client = client();
    register(&client).await;

    let resp = client
        .get(format!("{}/api/seller/dashboard", base_url()))
        .send()
        .await
        .expect("seller dashboard");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_catalog_is_public_and_cacheable() {
    let resp = Client::new()
        .get(format!("{}/api/products?page=1&per_page=12", base_url()))
        .send()
        .await
        .expect("catalog");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["cache-control"],
        "public, max-age=60"
    );
    let body: Value = resp.json().await.expect("JSON body");
    assert!(body["data"]["items"].is_array());
}

//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                            - Liveness
//! GET  /health/ready                      - Readiness (database)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/register                 - Create a customer account
//! POST /api/auth/login                    - Start a session
//! POST /api/auth/logout                   - End the session
//! GET  /api/auth/me                       - Current user
//!
//! # Account
//! GET  /api/account/addresses             - Saved addresses
//! POST /api/account/addresses             - Save an address
//! DELETE /api/account/addresses/{id}      - Remove an address
//! GET  /api/account/dashboard             - Customer overview
//!
//! # Catalog
//! GET  /api/products                      - Filtered, paginated listing
//! GET  /api/products/categories           - Categories with counts
//! GET  /api/products/{slug}               - Product detail
//! POST /api/products                      - Create (seller)
//! PUT  /api/products/{id}                 - Update (seller)
//! DELETE /api/products/{id}               - Deactivate (seller)
//! PATCH /api/products/{id}/stock          - Set stock (seller)
//! POST /api/products/{id}/images          - Upload images (seller)
//! DELETE /api/products/{id}/images/{public_id} - Remove an image (seller)
//!
//! # Cart
//! GET  /api/cart                          - Priced cart
//! POST /api/cart/items                    - Add a product
//! PUT  /api/cart/items/{product_id}       - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}     - Remove a line
//! DELETE /api/cart                        - Empty the cart
//!
//! # Orders
//! POST /api/orders                        - Checkout
//! GET  /api/orders                        - Own orders
//! GET  /api/orders/{id}                   - Own order detail
//! POST /api/orders/{id}/cancel            - Cancel before shipping
//!
//! # Payments
//! POST /api/payments/create-order         - Razorpay order for checkout
//! POST /api/payments/verify               - Verify checkout signature
//! POST /api/payments/webhook              - Razorpay webhook
//!
//! # Shipping webhooks
//! POST /api/webhooks/shipmojo             - ShipMozo status push
//! POST /api/webhooks/shipmozo             - Alias
//!
//! # Notifications
//! GET  /api/notifications                 - Latest notifications
//! GET  /api/notifications/unread-count    - Unread badge
//! GET  /api/notifications/stream          - Live SSE stream
//! PATCH /api/notifications/{id}/read      - Mark one read
//! POST /api/notifications/read-all        - Mark all read
//!
//! # Bookings
//! POST /api/bookings                      - Request a service visit
//! GET  /api/bookings                      - Own bookings
//! POST /api/bookings/{id}/cancel          - Cancel a visit
//!
//! # Seller
//! GET  /api/seller/dashboard              - Shop overview
//! GET  /api/seller/orders                 - All orders
//! PATCH /api/seller/orders/{id}/status    - Move an order along
//! POST /api/seller/orders/{id}/ship       - Book the shipment
//! GET  /api/seller/bookings               - All bookings
//! PATCH /api/seller/bookings/{id}         - Schedule or update a visit
//! ```

pub mod account;
pub mod auth;
pub mod bookings;
pub mod cart;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod seller;
pub mod webhooks;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};
use serde::de::DeserializeOwned;

use crate::cloudinary::MAX_UPLOAD_BYTES;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Parse an optional JSON body; an empty body yields the default.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}", delete(account::delete_address))
        .route("/dashboard", get(account::dashboard))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    // Multipart bodies carry several images plus form overhead.
    let upload_limit = MAX_UPLOAD_BYTES * products::MAX_FILES_PER_UPLOAD + 64 * 1024;

    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/categories", get(products::categories))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::deactivate),
        )
        .route("/{id}/stock", patch(products::set_stock))
        .route(
            "/{id}/images",
            post(products::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{id}/images/{*public_id}", delete(products::delete_image))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            put(cart::update).delete(cart::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::checkout))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the payment routes router.
///
/// The Razorpay webhook is authenticated by signature and not rate limited.
pub fn payment_routes() -> Router<AppState> {
    let checkout = Router::new()
        .route("/create-order", post(payments::create_order))
        .route("/verify", post(payments::verify))
        .layer(api_rate_limiter());

    Router::new()
        .merge(checkout)
        .route("/webhook", post(payments::webhook))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/unread-count", get(notifications::unread_count))
        .route("/stream", get(notifications::stream))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", patch(notifications::mark_read))
}

/// Create the booking routes router.
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(bookings::index).post(bookings::create))
        .route("/{id}/cancel", post(bookings::cancel))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(seller::dashboard))
        .route("/orders", get(seller::orders))
        .route("/orders/{id}/status", patch(seller::update_order_status))
        .route("/orders/{id}/ship", post(seller::ship_order))
        .route("/bookings", get(seller::bookings))
        .route("/bookings/{id}", patch(seller::update_booking))
}

/// Create the courier webhook routes router.
///
/// Authenticated by shared token, not rate limited.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/shipmojo", post(webhooks::shipment))
        .route("/shipmozo", post(webhooks::shipment))
}

/// Create all routes for the storefront API.
pub fn routes() -> Router<AppState> {
    let limited = Router::new()
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/notifications", notification_routes())
        .nest("/bookings", booking_routes())
        .nest("/seller", seller_routes())
        .layer(api_rate_limiter());

    let api = Router::new()
        .merge(limited)
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}

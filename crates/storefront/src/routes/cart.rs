//! Cart route handlers.
//!
//! One cart per user, stored server-side. Every mutation answers with the
//! freshly priced cart so the frontend never computes totals itself.

use axum::extract::State;
use tracing::instrument;

use aquamart_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{ApiJson, ApiPath, ApiResponse, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, UpdateCartItem, merged_quantity, validate_quantity};
use crate::models::{CartLine, CartSummary, Product};
use crate::state::AppState;

/// Price the user's current cart.
async fn summary(state: &AppState, user_id: UserId) -> Result<CartSummary> {
    let lines = CartRepository::new(state.pool())
        .lines(user_id)
        .await?
        .into_iter()
        .map(CartLine::from)
        .collect();
    Ok(CartSummary::new(lines, &state.config().shop))
}

/// An active product that can be put in a cart.
async fn purchasable(state: &AppState, product_id: ProductId) -> Result<Product> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    if product.stock <= 0 {
        return Err(AppError::BadRequest(format!("{} is out of stock", product.name)));
    }
    Ok(product)
}

/// Show the priced cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartSummary>> {
    Ok(ApiResponse::ok(summary(&state, user.id).await?))
}

/// Add a product, merging with an existing line.
///
/// The merged quantity is capped by the per-line limit and available stock.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<AddToCart>,
) -> Result<ApiResponse<CartSummary>> {
    validate_quantity(request.quantity, false)?;
    let product = purchasable(&state, request.product_id).await?;

    let carts = CartRepository::new(state.pool());
    let existing = carts.quantity(user.id, product.id).await?.unwrap_or(0);
    let quantity = merged_quantity(existing, request.quantity, product.stock);
    carts.set_quantity(user.id, product.id, quantity).await?;

    let message = if quantity < existing + request.quantity {
        format!("Only {quantity} of {} can be added", product.name)
    } else {
        "Added to cart".to_string()
    };
    tracing::debug!(product_id = %product.id, quantity, "cart line updated");

    Ok(ApiResponse::ok(summary(&state, user.id).await?).with_message(message))
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<UpdateCartItem>,
) -> Result<ApiResponse<CartSummary>> {
    validate_quantity(request.quantity, true)?;
    let carts = CartRepository::new(state.pool());
    if carts.quantity(user.id, product_id).await?.is_none() {
        return Err(AppError::NotFound("Item not in cart".to_string()));
    }

    if request.quantity == 0 {
        carts.remove(user.id, product_id).await?;
        return Ok(ApiResponse::ok(summary(&state, user.id).await?).with_message("Removed from cart"));
    }

    let product = purchasable(&state, product_id).await?;
    if request.quantity > product.stock {
        return Err(AppError::BadRequest(format!(
            "Only {} of {} left in stock",
            product.stock, product.name
        )));
    }
    carts
        .set_quantity(user.id, product_id, request.quantity)
        .await?;

    Ok(ApiResponse::ok(summary(&state, user.id).await?).with_message("Cart updated"))
}

/// Remove one line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<ApiResponse<CartSummary>> {
    if !CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?
    {
        return Err(AppError::NotFound("Item not in cart".to_string()));
    }
    Ok(ApiResponse::ok(summary(&state, user.id).await?).with_message("Removed from cart"))
}

/// Empty the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartSummary>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(ApiResponse::ok(summary(&state, user.id).await?).with_message("Cart cleared"))
}

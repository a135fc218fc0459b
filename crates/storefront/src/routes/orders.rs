//! Customer order route handlers: checkout, history and cancellation.

use axum::{body::Bytes, extract::State};
use tracing::instrument;

use aquamart_core::{OrderId, PaymentMethod};

use crate::db::OrderRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResponse, Result};
use crate::middleware::RequireAuth;
use crate::models::{
    CancelRequest, CheckoutRequest, Order, OrderDetail, OrderListQuery, Page, Pagination,
};
use crate::routes::optional_json;
use crate::services::orders::OrderService;
use crate::state::AppState;

pub(crate) fn order_service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.notifications(), state.email())
}

/// Place an order from the cart.
///
/// COD orders come back `confirmed`; online orders come back `pending` and
/// continue with `POST /api/payments/create-order`.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<ApiResponse<OrderDetail>> {
    let detail = order_service(&state)
        .checkout(&user, &request, &state.config().shop)
        .await?;
    // Listings and product pages show stock.
    state.catalog_cache().invalidate_all().await;

    let message = match detail.order.payment_method {
        PaymentMethod::Cod => "Order placed",
        PaymentMethod::Online => "Order created, complete the payment to confirm it",
    };
    Ok(ApiResponse::ok(detail).with_message(message))
}

/// The customer's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;
    let (orders, total) = OrderRepository::new(state.pool())
        .list(Some(user.id), query.status, pagination)
        .await?;
    Ok(ApiResponse::ok(Page::new(orders, pagination, total)))
}

/// One of the customer's orders with items and timeline.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<OrderDetail>> {
    let detail = order_service(&state).detail(id, Some(user.id)).await?;
    Ok(ApiResponse::ok(detail))
}

/// Cancel an order that has not been handed to the courier.
///
/// The body is optional; `{"reason": "..."}` is kept in the order history.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    body: Bytes,
) -> Result<ApiResponse<Order>> {
    let request: CancelRequest = optional_json(&body)?;
    let reason = request.reason;
    let order = order_service(&state)
        .cancel_by_customer(user.id, id, reason.as_deref())
        .await?;
    state.catalog_cache().invalidate_all().await;
    Ok(ApiResponse::ok(order).with_message("Order cancelled"))
}

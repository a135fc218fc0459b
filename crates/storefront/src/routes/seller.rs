//! Seller dashboard route handlers.
//!
//! Every handler requires a seller session.

use axum::{body::Bytes, extract::State};
use tracing::instrument;

use aquamart_core::{BookingId, OrderId, OrderStatus};

use crate::db::{BookingRepository, DashboardRepository, OrderRepository, ProductRepository};
use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResponse, Result, add_breadcrumb};
use crate::middleware::RequireSeller;
use crate::models::booking::BookingListQuery;
use crate::models::dashboard::{LOW_STOCK_THRESHOLD, SellerDashboard};
use crate::models::{
    Booking, BookingUpdate, Order, OrderListQuery, Page, Pagination, ShipRequest,
    StatusUpdateRequest,
};
use crate::routes::bookings::booking_service;
use crate::routes::optional_json;
use crate::routes::orders::order_service;
use crate::state::AppState;

/// Recent orders shown on the dashboard.
const RECENT_ORDERS: i64 = 5;

/// Shop overview: totals, status breakdowns, low stock, recent orders and
/// 30 days of paid revenue.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
) -> Result<ApiResponse<SellerDashboard>> {
    let pool = state.pool();
    let dashboard = DashboardRepository::new(pool);
    let products = ProductRepository::new(pool);
    let (totals, orders_by_status, bookings_by_status, low_stock, recent_orders, revenue_by_day) = tokio::try_join!(
        dashboard.seller_totals(),
        dashboard.orders_by_status(),
        dashboard.bookings_by_status(),
        products.low_stock(LOW_STOCK_THRESHOLD),
        dashboard.recent_orders(RECENT_ORDERS),
        dashboard.revenue_by_day(),
    )?;

    Ok(ApiResponse::ok(SellerDashboard {
        totals,
        orders_by_status,
        bookings_by_status,
        low_stock,
        recent_orders,
        revenue_by_day,
    }))
}

/// All orders, newest first, optionally filtered by status.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;
    let (orders, total) = OrderRepository::new(state.pool())
        .list(None, query.status, pagination)
        .await?;
    Ok(ApiResponse::ok(Page::new(orders, pagination, total)))
}

/// Move an order along its lifecycle.
#[instrument(skip(state, seller, request), fields(seller_id = %seller.id, to = %request.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<ApiResponse<Order>> {
    let order = order_service(&state)
        .update_status(id, request.status, request.note.as_deref())
        .await?;
    if order.status == OrderStatus::Cancelled {
        state.catalog_cache().invalidate_all().await;
    }
    Ok(ApiResponse::ok(order).with_message("Order status updated"))
}

/// Book the shipment with `ShipMozo`.
///
/// The body is optional: `{weight_kg, dimensions_cm, courier_id}`.
#[instrument(skip(state, seller, body), fields(seller_id = %seller.id))]
pub async fn ship_order(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<OrderId>,
    body: Bytes,
) -> Result<ApiResponse<Order>> {
    let request: ShipRequest = optional_json(&body)?;
    let order = order_service(&state)
        .ship(id, &request, state.shipmozo())
        .await?;

    add_breadcrumb(
        "shipping",
        "Shipment booked",
        Some(&[
            ("order_number", order.order_number.as_str()),
            ("awb", order.awb_number.as_deref().unwrap_or_default()),
        ]),
    );
    Ok(ApiResponse::ok(order).with_message("Shipment created"))
}

/// All bookings, newest first, optionally filtered by status.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn bookings(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<ApiResponse<Page<Booking>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;
    let (bookings, total) = BookingRepository::new(state.pool())
        .list(None, query.status, pagination)
        .await?;
    Ok(ApiResponse::ok(Page::new(bookings, pagination, total)))
}

/// Schedule, reassign or close a booking.
#[instrument(skip(state, seller, update), fields(seller_id = %seller.id, to = %update.status))]
pub async fn update_booking(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<BookingId>,
    ApiJson(update): ApiJson<BookingUpdate>,
) -> Result<ApiResponse<Booking>> {
    let booking = booking_service(&state).update(id, &update).await?;
    Ok(ApiResponse::ok(booking).with_message("Booking updated"))
}

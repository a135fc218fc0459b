//! Customer service booking route handlers.

use axum::extract::State;
use tracing::instrument;

use aquamart_core::BookingId;

use crate::db::BookingRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResponse, Result};
use crate::middleware::RequireAuth;
use crate::models::booking::BookingListQuery;
use crate::models::{Booking, BookingRequest, Page, Pagination};
use crate::services::bookings::BookingService;
use crate::state::AppState;

pub(crate) fn booking_service(state: &AppState) -> BookingService<'_> {
    BookingService::new(state.pool(), state.notifications(), state.email())
}

/// Request a service visit.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<ApiResponse<Booking>> {
    let booking = booking_service(&state).create(user.id, &request).await?;
    Ok(ApiResponse::ok(booking).with_message("Booking requested, we will confirm the visit soon"))
}

/// The customer's bookings, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<ApiResponse<Page<Booking>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;
    let (bookings, total) = BookingRepository::new(state.pool())
        .list(Some(user.id), query.status, pagination)
        .await?;
    Ok(ApiResponse::ok(Page::new(bookings, pagination, total)))
}

/// Cancel a visit that is still requested or scheduled.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BookingId>,
) -> Result<ApiResponse<Booking>> {
    let booking = booking_service(&state)
        .cancel_by_customer(user.id, id)
        .await?;
    Ok(ApiResponse::ok(booking).with_message("Booking cancelled"))
}

//! Account route handlers: saved addresses and the customer dashboard.

use axum::extract::State;
use tracing::instrument;

use aquamart_core::AddressId;

use crate::db::{AddressRepository, BookingRepository, DashboardRepository, OrderRepository};
use crate::error::{ApiJson, ApiPath, ApiResponse, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::dashboard::CustomerDashboard;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

/// The user's saved addresses, default first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(addresses))
}

/// Save a new address. Making it the default clears the previous default.
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(input): ApiJson<AddressInput>,
) -> Result<ApiResponse<Address>> {
    input.address.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok(ApiResponse::ok(address).with_message("Address saved"))
}

/// Remove one of the user's addresses.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<ApiResponse<()>> {
    if !AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await?
    {
        return Err(AppError::NotFound("Address not found".to_string()));
    }
    Ok(ApiResponse::message("Address removed"))
}

/// Order count, spend, live orders and upcoming visits.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CustomerDashboard>> {
    let pool = state.pool();
    let dashboard = DashboardRepository::new(pool);
    let orders = OrderRepository::new(pool);
    let bookings = BookingRepository::new(pool);
    let (totals, active_orders, upcoming_bookings) = tokio::try_join!(
        dashboard.customer_totals(user.id),
        orders.active_for_user(user.id),
        bookings.upcoming_for_user(user.id),
    )?;

    Ok(ApiResponse::ok(CustomerDashboard {
        totals,
        active_orders,
        upcoming_bookings,
    }))
}

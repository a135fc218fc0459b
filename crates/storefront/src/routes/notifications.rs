//! Notification route handlers and the live SSE stream.

use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::instrument;

use aquamart_core::NotificationId;

use crate::db::NotificationRepository;
use crate::error::{ApiPath, ApiQuery, ApiResponse, Result};
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::models::notification::NotificationQuery;
use crate::state::AppState;

/// SSE event name for a new notification.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Keep-alive comment interval; below common proxy idle timeouts.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Body of `GET /api/notifications/unread-count`.
#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

/// Body of `POST /api/notifications/read-all`.
#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// Latest notifications, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<ApiResponse<Vec<Notification>>> {
    let notifications = NotificationRepository::new(state.pool())
        .list(user.id, &query)
        .await?;
    Ok(ApiResponse::ok(notifications))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn unread_count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<UnreadCount>> {
    let count = NotificationRepository::new(state.pool())
        .unread_count(user.id)
        .await?;
    Ok(ApiResponse::ok(UnreadCount { count }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<ApiResponse<Notification>> {
    let notification = NotificationRepository::new(state.pool())
        .mark_read(user.id, id)
        .await?;
    Ok(ApiResponse::ok(notification))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<MarkedRead>> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(user.id)
        .await?;
    Ok(ApiResponse::ok(MarkedRead { updated }).with_message("All notifications marked read"))
}

/// Server-Sent Events stream of the user's new notifications.
///
/// Each event is named `notification` and carries the stored notification
/// as JSON. Only notifications created after the connection opened are sent;
/// the client loads history from `GET /api/notifications`.
pub async fn stream(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    tracing::debug!(user_id = %user.id, "notification stream opened");

    let events = state
        .notifications()
        .subscribe(user.id)
        .map(|notification| {
            Event::default()
                .event(NOTIFICATION_EVENT)
                .id(notification.id.to_string())
                .json_data(&*notification)
        });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

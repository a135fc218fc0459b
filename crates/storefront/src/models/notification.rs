//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aquamart_core::{NotificationId, NotificationKind, OrderId, UserId};

/// Upper bound on notifications returned in one listing.
pub const NOTIFICATION_LIST_LIMIT: i64 = 50;

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: Option<OrderId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification waiting to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: Option<OrderId>,
}

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

impl NotificationQuery {
    /// Requested limit clamped to `1..=50`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(NOTIFICATION_LIST_LIMIT)
            .clamp(1, NOTIFICATION_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(NotificationQuery::default().limit(), 50);
        let q = NotificationQuery {
            unread_only: false,
            limit: Some(500),
        };
        assert_eq!(q.limit(), 50);
        let q = NotificationQuery {
            unread_only: true,
            limit: Some(0),
        };
        assert_eq!(q.limit(), 1);
    }
}

//! Notification persistence and live push.
//!
//! Notifications are stored first, then broadcast on a [`NotificationHub`].
//! Each SSE connection subscribes to the hub and keeps only its own user's
//! events.

use std::sync::Arc;

use futures::Stream;
use sqlx::PgPool;
use tokio::sync::broadcast;

use aquamart_core::{NotificationKind, OrderId, UserId};

use crate::db::{NotificationRepository, RepositoryError, UserRepository};
use crate::models::{NewNotification, Notification};

/// Default broadcast buffer per subscriber.
pub const HUB_CAPACITY: usize = 256;

/// In-process fan-out of freshly stored notifications.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Arc<Notification>>,
}

impl NotificationHub {
    /// Create a hub with the given per-subscriber buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification. Returns how many connections received it.
    pub fn publish(&self, notification: Notification) -> usize {
        // No subscribers is not an error.
        self.sender.send(Arc::new(notification)).unwrap_or(0)
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of notifications addressed to `user_id`.
    ///
    /// Slow consumers skip what they missed; the stream ends when the hub is dropped.
    pub fn subscribe(&self, user_id: UserId) -> impl Stream<Item = Arc<Notification>> + use<> {
        let mut receiver = self.sender.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(notification) if notification.user_id == user_id => yield notification,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user_id, skipped, "notification stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

/// Stores notifications and pushes them live.
pub struct Notifier<'a> {
    pool: &'a PgPool,
    hub: &'a NotificationHub,
}

impl<'a> Notifier<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self { pool, hub }
    }

    /// Persist and push one notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if it cannot be stored.
    pub async fn notify(&self, new: &NewNotification) -> Result<Notification, RepositoryError> {
        let notification = NotificationRepository::new(self.pool).create(new).await?;
        let delivered = self.hub.publish(notification.clone());
        tracing::debug!(
            user_id = %notification.user_id,
            kind = %notification.kind,
            delivered,
            "notification pushed"
        );
        Ok(notification)
    }

    /// Notify every seller account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if sellers cannot be listed or a
    /// notification cannot be stored.
    pub async fn notify_sellers(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        order_id: Option<OrderId>,
    ) -> Result<usize, RepositoryError> {
        let sellers = UserRepository::new(self.pool).seller_ids().await?;
        for &user_id in &sellers {
            self.notify(&NewNotification {
                user_id,
                kind,
                title: title.to_owned(),
                message: message.to_owned(),
                order_id,
            })
            .await?;
        }
        Ok(sellers.len())
    }

    /// Like [`Notifier::notify`] but only logs failures.
    pub async fn deliver(&self, new: NewNotification) {
        if let Err(e) = self.notify(&new).await {
            tracing::warn!(user_id = %new.user_id, error = %e, "failed to store notification");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::StreamExt;
    use aquamart_core::NotificationId;

    fn notification(id: i32, user: i32) -> Notification {
        Notification {
            id: NotificationId::new(id),
            user_id: UserId::new(user),
            kind: NotificationKind::OrderStatus,
            title: "Order shipped".to_string(),
            message: "AQ261016000042 is on its way".to_string(),
            order_id: Some(OrderId::new(42)),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_own_notifications() {
        let hub = NotificationHub::new(16);
        let stream = hub.subscribe(UserId::new(7));
        futures::pin_mut!(stream);

        assert_eq!(hub.subscriber_count(), 1);
        hub.publish(notification(1, 8));
        hub.publish(notification(2, 7));

        let received = stream.next().await.unwrap();
        assert_eq!(received.id, NotificationId::new(2));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = NotificationHub::default();
        assert_eq!(hub.publish(notification(1, 1)), 0);
    }
}

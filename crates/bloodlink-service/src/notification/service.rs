//! Notification listing and read-state sync.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, RealtimeChannel, user_room};
use bloodlink_core::types::{NotificationId, UserId};
use bloodlink_database::NotificationRepository;
use bloodlink_entity::notification::{DeliveryRecord, Notification};

/// Realtime event telling a user's other sessions a notification was read.
pub const NOTIFICATION_READ_EVENT: &str = "notification:read";

/// Largest page `list` returns.
pub const MAX_PAGE: usize = 100;

/// Manages user notifications.
#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    realtime: Arc<dyn RealtimeChannel>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("realtime", &self.realtime.name())
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        realtime: Arc<dyn RealtimeChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            realtime,
            clock,
        }
    }

    /// Newest notifications for a user, at most `limit` (capped).
    pub async fn list(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Notification>> {
        self.notifications
            .list_for_user(user_id, limit.clamp(1, MAX_PAGE))
            .await
    }

    /// Gets the unread notification count.
    pub async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        self.notifications.count_unread(user_id).await
    }

    /// Marks a notification as read and tells the user's other sessions.
    ///
    /// Marking it again keeps the original `read_at`. Notifications owned by
    /// someone else are reported as not found.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<Notification> {
        let notification = self
            .notifications
            .mark_read(notification_id, user_id, self.clock.now())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Notification {notification_id} not found"))
            })?;

        let event = json!({
            "notification_id": notification.id,
            "read_at": notification.read_at,
        });
        if let Err(e) = self
            .realtime
            .emit(&user_room(user_id), NOTIFICATION_READ_EVENT, event)
            .await
        {
            warn!(notification_id = %notification.id, error = %e, "Read state not broadcast");
        }
        Ok(notification)
    }

    /// Channel outcomes recorded for one of the user's notifications.
    pub async fn deliveries(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<Vec<DeliveryRecord>> {
        match self.notifications.find(notification_id).await? {
            Some(n) if n.user_id == user_id => self.notifications.deliveries(notification_id).await,
            _ => Err(AppError::not_found(format!(
                "Notification {notification_id} not found"
            ))),
        }
    }
}

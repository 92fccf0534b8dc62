//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::{NotificationId, RequestId, UserId};

use super::payload::{NotificationPayload, NotificationType};

/// An in-app notification. Only `read` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Typed data; also determines the notification type.
    pub payload: NotificationPayload,
    /// Whether the notification should be highlighted.
    pub urgent: bool,
    /// Whether the user has read this notification.
    pub read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification.
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        payload: NotificationPayload,
        urgent: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            title: title.into(),
            message: message.into(),
            payload,
            urgent,
            read: false,
            read_at: None,
            created_at: now,
        }
    }

    /// The notification category.
    pub fn kind(&self) -> NotificationType {
        self.payload.kind()
    }

    /// The dispatch idempotency key: set only for blood request alerts.
    pub fn dispatch_key(&self) -> Option<(RequestId, UserId)> {
        match &self.payload {
            NotificationPayload::BloodRequest { request_id, .. } => Some((*request_id, self.user_id)),
            _ => None,
        }
    }
}

//! In-memory notification storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use bloodlink_core::result::AppResult;
use bloodlink_core::types::{NotificationId, RequestId, UserId};
use bloodlink_entity::notification::{DeliveryRecord, Notification};

use crate::repositories::NotificationRepository;

/// Notifications keyed by id, with the dispatch idempotency index.
#[derive(Debug, Default)]
pub struct MemoryNotificationRepository {
    notifications: DashMap<NotificationId, Notification>,
    dispatched: DashMap<(RequestId, UserId), NotificationId>,
    deliveries: DashMap<NotificationId, Vec<DeliveryRecord>>,
}

impl MemoryNotificationRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        notification: &Notification,
    ) -> AppResult<(Notification, bool)> {
        let Some(key) = notification.dispatch_key() else {
            self.insert(notification).await?;
            return Ok((notification.clone(), true));
        };
        match self.dispatched.entry(key) {
            Entry::Occupied(existing) => {
                let stored = self
                    .notifications
                    .get(existing.get())
                    .map(|n| n.value().clone())
                    .unwrap_or_else(|| notification.clone());
                Ok((stored, false))
            }
            Entry::Vacant(slot) => {
                self.notifications
                    .insert(notification.id, notification.clone());
                slot.insert(notification.id);
                Ok((notification.clone(), true))
            }
        }
    }

    async fn find(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.value().clone()))
    }

    async fn list_for_user(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.value().clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let Some(mut notification) = self.notifications.get_mut(&id) else {
            return Ok(None);
        };
        if notification.user_id != user_id {
            return Ok(None);
        }
        if !notification.read {
            notification.read = true;
            notification.read_at = Some(now);
        }
        Ok(Some(notification.clone()))
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> AppResult<()> {
        self.deliveries
            .entry(record.notification_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn deliveries(&self, id: NotificationId) -> AppResult<Vec<DeliveryRecord>> {
        Ok(self
            .deliveries
            .get(&id)
            .map(|d| d.value().clone())
            .unwrap_or_default())
    }
}

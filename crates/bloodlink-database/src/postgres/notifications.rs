//! Notification repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::types::{NotificationId, UserId};
use bloodlink_entity::notification::{DeliveryRecord, Notification};

use super::db_err;
use super::rows::{DeliveryRow, NotificationRow};
use crate::repositories::NotificationRepository;

const COLUMNS: &str = "id, user_id, title, message, payload, urgent, read, read_at, created_at";

/// Notifications in `notifications`, outcomes in `notification_deliveries`.
#[derive(Debug, Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, notification: &Notification, on_conflict: &str) -> AppResult<u64> {
        let payload = serde_json::to_value(&notification.payload)?;
        let sql = format!(
            "INSERT INTO notifications (id, user_id, type, request_id, title, message, payload, \
             urgent, read, read_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) {on_conflict}"
        );
        let result = sqlx::query(&sql)
            .bind(notification.id.into_uuid())
            .bind(notification.user_id.into_uuid())
            .bind(notification.kind().as_str())
            .bind(notification.payload.request_id().map(|r| r.into_uuid()))
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(payload)
            .bind(notification.urgent)
            .bind(notification.read)
            .bind(notification.read_at)
            .bind(notification.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to insert notification"))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.insert_row(notification, "").await?;
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        notification: &Notification,
    ) -> AppResult<(Notification, bool)> {
        let Some((request_id, user_id)) = notification.dispatch_key() else {
            self.insert(notification).await?;
            return Ok((notification.clone(), true));
        };

        let inserted = self
            .insert_row(
                notification,
                "ON CONFLICT (request_id, user_id) WHERE type = 'blood_request' DO NOTHING",
            )
            .await?;
        if inserted == 1 {
            return Ok((notification.clone(), true));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE request_id = $1 AND user_id = $2 AND type = 'blood_request'"
        );
        let existing = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(request_id.into_uuid())
            .bind(user_id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load notification"))?
            .ok_or_else(|| AppError::internal("Notification conflict without existing record"))?;
        Ok((Notification::try_from(existing)?, false))
    }

    async fn find(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let sql = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load notification"))?
            .map(Notification::try_from)
            .transpose()
    }

    async fn list_for_user(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id.into_uuid())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list notifications"))?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id.into_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count unread notifications"))?;
        Ok(count.max(0) as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let sql = format!(
            "UPDATE notifications SET read = TRUE, read_at = COALESCE(read_at, $3) \
             WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id.into_uuid())
            .bind(user_id.into_uuid())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to mark notification read"))?
            .map(Notification::try_from)
            .transpose()
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> AppResult<()> {
        let outcome = serde_json::to_value(&record.outcome)?;
        sqlx::query(
            "INSERT INTO notification_deliveries (notification_id, channel, outcome, attempts, recorded_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.notification_id.into_uuid())
        .bind(record.channel.as_str())
        .bind(outcome)
        .bind(record.attempts as i32)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to record delivery"))?;
        Ok(())
    }

    async fn deliveries(&self, id: NotificationId) -> AppResult<Vec<DeliveryRecord>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            "SELECT notification_id, channel, outcome, attempts, recorded_at \
             FROM notification_deliveries WHERE notification_id = $1 ORDER BY id",
        )
        .bind(id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load deliveries"))?;
        rows.into_iter().map(DeliveryRecord::try_from).collect()
    }
}

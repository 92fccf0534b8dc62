//! Notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use bloodlink_core::types::NotificationId;
use bloodlink_entity::notification::Notification;

use crate::dto::{ApiResponse, NotificationListResponse, NotificationQuery};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<NotificationListResponse>>, ApiError> {
    let user_id = auth.user_id();
    let notifications = state.engine.notifications_for(user_id, params.limit).await?;
    let unread = state.engine.unread_count(user_id).await?;
    Ok(Json(ApiResponse::ok(NotificationListResponse {
        notifications,
        unread,
    })))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = state
        .engine
        .mark_notification_read(NotificationId::from(id), auth.user_id())
        .await?;
    Ok(Json(ApiResponse::ok(notification)))
}

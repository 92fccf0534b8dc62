//! Realtime room event bus trait.

use async_trait::async_trait;

use crate::error::AppError;

/// Room-based, fire-and-forget event bus.
///
/// Emitting to a room with no members is not an error.
#[async_trait]
pub trait RealtimeChannel: Send + Sync + 'static {
    /// Publish `event` with `payload` to every member of `room`.
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError>;

    /// Subscribe this channel's own session to `room`.
    async fn join_room(&self, room: &str) -> Result<(), AppError>;

    /// Short name used in logs and delivery records.
    fn name(&self) -> &'static str;
}

/// Room for everything addressed to one user.
pub fn user_room(user_id: impl std::fmt::Display) -> String {
    format!("user:{user_id}")
}

/// Room for watchers of one blood request.
pub fn request_room(request_id: impl std::fmt::Display) -> String {
    format!("request:{request_id}")
}

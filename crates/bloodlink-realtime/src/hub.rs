//! In-process room hub serving locally connected WebSocket clients.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use bloodlink_core::config::RealtimeConfig;
use bloodlink_core::error::AppError;
use bloodlink_core::traits::{RealtimeChannel, user_room};
use bloodlink_core::types::{RequestId, UserId};

use crate::connection::{ConnectionHandle, ConnectionId, ConnectionPool};
use crate::message::OutboundMessage;
use crate::room::RoomRegistry;

/// Routes room events to the local connections that joined them.
#[derive(Debug)]
pub struct RoomHub {
    pool: ConnectionPool,
    rooms: RoomRegistry,
    config: RealtimeConfig,
}

impl RoomHub {
    /// Create an empty hub.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            pool: ConnectionPool::new(),
            rooms: RoomRegistry::new(),
            config,
        }
    }

    /// Register a new connection for `user_id` and join its personal room.
    pub fn connect(
        &self,
        user_id: UserId,
    ) -> Result<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>), AppError> {
        if self.pool.user_connection_count(&user_id) >= self.config.max_connections_per_user {
            return Err(AppError::conflict(format!(
                "Maximum of {} realtime connections reached",
                self.config.max_connections_per_user
            )));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));
        self.pool.add(handle.clone());
        self.rooms.join(&user_room(user_id), handle.id);

        info!(
            connection_id = %handle.id,
            user_id = %user_id,
            total = self.pool.connection_count(),
            "Realtime client connected"
        );
        Ok((handle, rx))
    }

    /// Forget a connection and all of its rooms.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        self.rooms.leave_all(conn_id);
        if let Some(handle) = self.pool.remove(&conn_id) {
            handle.mark_dead();
            info!(connection_id = %conn_id, user_id = %handle.user_id, "Realtime client disconnected");
        }
    }

    /// Join a room on behalf of a client.
    ///
    /// Clients may join their own `user:` room and any `request:` room.
    pub fn join(&self, conn_id: ConnectionId, room: &str) -> Result<(), AppError> {
        let handle = self
            .pool
            .get(&conn_id)
            .ok_or_else(|| AppError::not_found("Connection not found"))?;

        if !may_join(handle.user_id, room) {
            return Err(AppError::authorization(format!("Cannot join room '{room}'")));
        }
        if self.rooms.room_count(conn_id) >= self.config.max_rooms_per_connection {
            return Err(AppError::conflict("Room limit reached for this connection"));
        }

        self.rooms.join(room, conn_id);
        handle.send(OutboundMessage::Joined {
            room: room.to_string(),
        });
        Ok(())
    }

    /// Leave a room on behalf of a client.
    pub fn leave(&self, conn_id: ConnectionId, room: &str) {
        if self.rooms.leave(room, conn_id) {
            if let Some(handle) = self.pool.get(&conn_id) {
                handle.send(OutboundMessage::Left {
                    room: room.to_string(),
                });
            }
        }
    }

    /// Deliver a message to every member of `room`. Returns how many
    /// connections accepted it.
    pub fn publish(&self, room: &str, msg: &OutboundMessage) -> usize {
        self.rooms
            .members(room)
            .into_iter()
            .filter_map(|id| self.pool.get(&id))
            .filter(|handle| handle.send(msg.clone()))
            .count()
    }

    /// The connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

fn may_join(user_id: UserId, room: &str) -> bool {
    if let Some(owner) = room.strip_prefix("user:") {
        return owner.parse::<UserId>().is_ok_and(|id| id == user_id);
    }
    if let Some(request) = room.strip_prefix("request:") {
        return request.parse::<RequestId>().is_ok();
    }
    false
}

#[async_trait]
impl RealtimeChannel for RoomHub {
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        let delivered = self.publish(room, &OutboundMessage::event(room, event, payload));
        debug!(room, event, delivered, "Emitted realtime event");
        Ok(())
    }

    async fn join_room(&self, room: &str) -> Result<(), AppError> {
        debug!(room, "Local hub receives every room; nothing to join");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hub"
    }
}

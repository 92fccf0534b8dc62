//! A single client connection.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use bloodlink_core::types::UserId;

use crate::message::OutboundMessage;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// The sending side of one WebSocket connection plus its owner.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Connection id.
    pub id: ConnectionId,
    /// Authenticated owner.
    pub user_id: UserId,
    /// Outbound queue drained by the socket writer task.
    sender: mpsc::Sender<OutboundMessage>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    pub last_pong: tokio::sync::RwLock<DateTime<Utc>>,
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle for `user_id`.
    pub fn new(user_id: UserId, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            sender,
            connected_at: now,
            last_pong: tokio::sync::RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue a message without waiting. Returns `false` if it was dropped.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Whether the connection is still usable.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop delivering to this connection.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong.
    pub async fn record_pong(&self) {
        *self.last_pong.write().await = Utc::now();
    }
}

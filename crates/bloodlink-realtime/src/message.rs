//! WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent by a client to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Start receiving events for a room.
    JoinRoom {
        /// Room name.
        room: String,
    },
    /// Stop receiving events for a room.
    LeaveRoom {
        /// Room name.
        room: String,
    },
    /// Reply to a server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
    /// Mark a notification read from this session.
    MarkRead {
        /// Notification id.
        notification_id: Uuid,
    },
}

/// Messages sent by the hub to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Room membership confirmed.
    Joined {
        /// Room name.
        room: String,
    },
    /// Room membership removed.
    Left {
        /// Room name.
        room: String,
    },
    /// An event published to a room the client is in.
    Event {
        /// Room the event was published to.
        room: String,
        /// Event name, e.g. `notification:new`.
        event: String,
        /// Event body.
        payload: serde_json::Value,
        /// Publish time.
        timestamp: DateTime<Utc>,
    },
    /// Keepalive probe.
    Ping {
        /// Send time.
        timestamp: DateTime<Utc>,
    },
    /// A client request was refused.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl OutboundMessage {
    /// Build a room event stamped with the current time.
    pub fn event(room: &str, event: &str, payload: serde_json::Value) -> Self {
        Self::Event {
            room: room.to_string(),
            event: event.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Build an error reply.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

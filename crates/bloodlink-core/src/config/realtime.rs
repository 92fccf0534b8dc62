//! Realtime channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Realtime room hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum WebSocket connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound buffer size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Maximum rooms a single connection may join.
    #[serde(default = "default_max_rooms")]
    pub max_rooms_per_connection: usize,
    /// Optional external realtime gateway. When set, events are forwarded
    /// there instead of the in-process hub.
    #[serde(default)]
    pub remote: Option<RemoteLinkConfig>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            max_rooms_per_connection: default_max_rooms(),
            remote: None,
        }
    }
}

/// External realtime gateway link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLinkConfig {
    /// `ws://` or `wss://` URL of the gateway.
    pub url: String,
    /// Reconnect behaviour after the link drops.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

/// How the remote link re-establishes a dropped connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Consecutive connect attempts before an emit fails.
    #[serde(default = "default_reconnect_attempts")]
    pub max_attempts: u32,
    /// Delay between connect attempts, in milliseconds.
    #[serde(default = "default_reconnect_backoff")]
    pub backoff_ms: u64,
}

impl ReconnectPolicy {
    /// Delay between connect attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_reconnect_attempts(),
            backoff_ms: default_reconnect_backoff(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_max_rooms() -> usize {
    50
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_backoff() -> u64 {
    500
}

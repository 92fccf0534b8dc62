//! Periodic ping and dead-connection sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::hub::RoomHub;
use crate::message::OutboundMessage;

/// Missed ping intervals tolerated before a connection is dropped.
const MISSED_PONGS: u32 = 3;

/// Ping every connection each `interval` and disconnect silent ones.
pub fn spawn_heartbeat(hub: Arc<RoomHub>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        let timeout = interval * MISSED_PONGS;

        loop {
            ticker.tick().await;

            for handle in hub.pool().all_connections() {
                let last_pong = *handle.last_pong.read().await;
                let silent_for = (Utc::now() - last_pong).to_std().unwrap_or_default();

                if !handle.is_alive() || silent_for > timeout {
                    warn!(
                        connection_id = %handle.id,
                        silent_secs = silent_for.as_secs(),
                        "Dropping unresponsive realtime connection"
                    );
                    hub.disconnect(handle.id);
                    continue;
                }

                if !handle.send(OutboundMessage::Ping {
                    timestamp: Utc::now(),
                }) {
                    debug!(connection_id = %handle.id, "Ping not queued");
                }
            }
        }
    })
}

//! Client link to an external realtime gateway.
//!
//! The link owns one WebSocket connection. A send that finds the socket
//! closed reconnects according to the configured [`ReconnectPolicy`] and
//! re-joins every room joined so far before retrying once.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use bloodlink_core::config::{ReconnectPolicy, RemoteLinkConfig};
use bloodlink_core::error::AppError;
use bloodlink_core::traits::RealtimeChannel;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Realtime channel backed by a remote gateway.
pub struct RemoteLink {
    url: String,
    policy: ReconnectPolicy,
    sink: Mutex<Option<WsSink>>,
    rooms: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for RemoteLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLink")
            .field("url", &self.url)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RemoteLink {
    /// Create a link. The connection is opened lazily on first use.
    pub fn new(config: &RemoteLinkConfig) -> Self {
        Self {
            url: config.url.clone(),
            policy: config.reconnect.clone(),
            sink: Mutex::new(None),
            rooms: Mutex::new(HashSet::new()),
        }
    }

    async fn connect(&self) -> Result<WsSink, AppError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    let (mut sink, mut read) = stream.split();
                    tokio::spawn(async move {
                        while let Some(frame) = read.next().await {
                            match frame {
                                Ok(Message::Close(_)) | Err(_) => break,
                                Ok(other) => debug!(len = other.len(), "Gateway frame ignored"),
                            }
                        }
                        debug!("Gateway reader stopped");
                    });

                    let rooms: Vec<String> = self.rooms.lock().await.iter().cloned().collect();
                    for room in rooms {
                        let frame = json!({ "action": "join", "room": room });
                        sink.send(Message::Text(frame.to_string().into()))
                            .await
                            .map_err(|e| {
                                AppError::external_service(format!("Failed to rejoin room: {e}"))
                            })?;
                    }

                    info!(url = %self.url, attempt, "Connected to realtime gateway");
                    return Ok(sink);
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(url = %self.url, attempt, error = %e, "Realtime gateway connect failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff()).await;
                    }
                }
            }
        }

        Err(AppError::external_service(format!(
            "Realtime gateway unreachable after {attempts} attempts: {last_error}"
        )))
    }

    async fn send_frame(&self, frame: serde_json::Value) -> Result<(), AppError> {
        let text = frame.to_string();
        let mut guard = self.sink.lock().await;

        for _ in 0..2 {
            if guard.is_none() {
                *guard = Some(self.connect().await?);
            }
            let Some(sink) = guard.as_mut() else {
                continue;
            };
            match sink.send(Message::Text(text.clone().into())).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "Realtime gateway send failed, reconnecting");
                    *guard = None;
                }
            }
        }

        Err(AppError::external_service("Realtime gateway link dropped"))
    }

    /// Close the connection if one is open.
    pub async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }
    }
}

#[async_trait]
impl RealtimeChannel for RemoteLink {
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        self.send_frame(json!({
            "action": "emit",
            "room": room,
            "event": event,
            "payload": payload,
        }))
        .await
    }

    async fn join_room(&self, room: &str) -> Result<(), AppError> {
        if !self.rooms.lock().await.insert(room.to_string()) {
            return Ok(());
        }
        self.send_frame(json!({ "action": "join", "room": room }))
            .await
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_core::error::ErrorKind;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    async fn gateway() -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    while let Some(Ok(Message::Text(text))) = ws.next().await {
                        let _ = tx.send(serde_json::from_str(text.as_str()).unwrap());
                    }
                });
            }
        });
        (format!("ws://{addr}"), rx)
    }

    #[tokio::test]
    async fn test_emit_reaches_gateway() {
        let (url, mut frames) = gateway().await;
        let link = RemoteLink::new(&RemoteLinkConfig {
            url,
            reconnect: ReconnectPolicy::default(),
        });

        link.join_room("request:1").await.unwrap();
        link.emit("request:1", "donation:update", json!({"status": "completed"}))
            .await
            .unwrap();

        let join = frames.recv().await.unwrap();
        assert_eq!(join["action"], "join");
        let emit = frames.recv().await.unwrap();
        assert_eq!(emit["event"], "donation:update");
        assert_eq!(emit["payload"]["status"], "completed");
        link.close().await;
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_external_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let link = RemoteLink::new(&RemoteLinkConfig {
            url: format!("ws://{addr}"),
            reconnect: ReconnectPolicy {
                max_attempts: 2,
                backoff_ms: 10,
            },
        });
        let err = link.emit("user:x", "ping", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}

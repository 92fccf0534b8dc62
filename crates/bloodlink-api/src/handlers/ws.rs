//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use bloodlink_core::error::{AppError, ErrorKind};
use bloodlink_core::types::{NotificationId, UserId};
use bloodlink_realtime::{ConnectionHandle, InboundMessage, OutboundMessage, RoomHub};

use crate::error::{ApiError, status_for};
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Session token.
    pub token: String,
}

/// GET /ws?token={jwt}
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let hub = state.hub.clone().ok_or_else(|| {
        AppError::not_found("Realtime clients are served by the remote gateway")
    })?;

    // Authenticate before upgrade
    let claims = state.engine.authenticate(&query.token)?;
    let user_id = claims.user_id();

    Ok(ws.on_upgrade(move |socket| handle_connection(state, hub, user_id, socket)))
}

async fn handle_connection(
    state: AppState,
    hub: Arc<RoomHub>,
    user_id: UserId,
    socket: WebSocket,
) {
    let (handle, mut outbound_rx) = match hub.connect(user_id) {
        Ok(pair) => pair,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Realtime connection refused");
            let (mut ws_tx, _) = socket.split();
            let refusal = OutboundMessage::error("CONFLICT", e.message);
            if let Ok(text) = serde_json::to_string(&refusal) {
                let _ = ws_tx.send(Message::Text(text.into())).await;
            }
            let _ = ws_tx.close().await;
            return;
        }
    };
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode realtime message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_inbound(&state, &hub, &handle, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    hub.disconnect(conn_id);
    info!(connection_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

async fn handle_inbound(state: &AppState, hub: &RoomHub, handle: &ConnectionHandle, text: &str) {
    let msg = match serde_json::from_str::<InboundMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(connection_id = %handle.id, error = %e, "Unparseable client message");
            handle.send(OutboundMessage::error("BAD_MESSAGE", "Unrecognized message"));
            return;
        }
    };

    let result = match msg {
        InboundMessage::JoinRoom { room } => hub.join(handle.id, &room),
        InboundMessage::LeaveRoom { room } => {
            hub.leave(handle.id, &room);
            Ok(())
        }
        InboundMessage::Pong { .. } => {
            handle.record_pong().await;
            Ok(())
        }
        InboundMessage::MarkRead { notification_id } => state
            .engine
            .mark_notification_read(NotificationId::from(notification_id), handle.user_id)
            .await
            .map(|_| ()),
    };

    if let Err(e) = result {
        let (_, code) = status_for(e.kind);
        let message = if e.is(ErrorKind::Internal) || e.is(ErrorKind::Database) {
            "Internal server error".to_string()
        } else {
            e.message
        };
        handle.send(OutboundMessage::error(code, message));
    }
}

/// Realtime WebSocket endpoint
///
/// Each connection is registered with the [`RealtimeHub`] and then serves two
/// directions until either side goes away:
///
/// - frames queued for the socket by the hub are written out as text
/// - text frames from the client are handed to
///   [`RealtimeHub::handle_client_message`] (`register`, `joinTeamBoard`,
///   `activity:new`)
///
/// The endpoint is unauthenticated; a client joins rooms by naming them.
///
/// # Endpoint
///
/// ```text
/// GET /ws   (Upgrade: websocket)
/// ```
///
/// [`RealtimeHub`]: teamboard_shared::realtime::RealtimeHub
/// [`RealtimeHub::handle_client_message`]: teamboard_shared::realtime::RealtimeHub::handle_client_message

use crate::app::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use teamboard_shared::realtime::RealtimeHub;

/// Upgrades the connection and hands it to the hub
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_socket(hub, socket))
}

async fn serve_socket(hub: Arc<RealtimeHub>, socket: WebSocket) {
    let (socket_id, mut outbound) = hub.connect().await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if sink.send(Message::Text(frame)).await.is_err() {
                    tracing::debug!(socket = socket_id, "[Realtime] Send failed, closing socket");
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = hub.handle_client_message(socket_id, &text).await {
                            tracing::warn!(socket = socket_id, error = %e, "[Realtime] Rejected client frame");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(socket = socket_id, error = %e, "[Realtime] Socket error");
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(socket_id).await;
}

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use awbtrack::EventBroadcaster;

use super::heartbeat;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

/// Manage a single WebSocket connection after upgrade.
///
/// A sender task forwards broadcaster events and heartbeat pings; the
/// current task drains inbound frames until the viewer goes away. When the
/// broadcaster closes the subscription (server shutdown) the sender task
/// sends a Close frame.
async fn handle_socket(socket: WebSocket, broadcaster: Arc<EventBroadcaster>) {
    let (subscriber, mut events) = broadcaster.subscribe();
    tracing::info!(subscriber, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        let mut heartbeat = heartbeat::ticker();
        loop {
            let message = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => {
                            tracing::warn!(subscriber, error = %e, "Could not serialize event");
                            continue;
                        }
                    },
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = heartbeat.tick() => Message::Ping(Bytes::new()),
            };

            if sink.send(message).await.is_err() {
                tracing::debug!(subscriber, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(subscriber, "Pong received");
            }
            // Viewers only listen.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subscriber, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    broadcaster.unsubscribe(subscriber);
    send_task.abort();
    tracing::info!(subscriber, "WebSocket disconnected");
}

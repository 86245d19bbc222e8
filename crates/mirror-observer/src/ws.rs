//! `WebSocket` handler for the live observer stream.
//!
//! Clients connect to `GET /ws` and receive JSON-encoded
//! [`ServerEvent`] text frames (`{"type": ..., "data": ...}`). Each
//! connection runs its own [`BroadcastLoop`], so a slow client only
//! delays itself.
//!
//! The socket is split: the write half becomes the loop's [`EventSink`],
//! the read half is drained until the client closes, which ends the loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use mirror_core::{BroadcastLoop, EventSink, SinkError};
use mirror_types::ServerEvent;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming events.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Write half of a client socket.
struct WsSink(SplitSink<WebSocket, Message>);

impl EventSink for WsSink {
    async fn send(&mut self, event: &ServerEvent) -> Result<(), SinkError> {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(kind = event.kind(), "Failed to serialize event: {e}");
                return Ok(());
            }
        };
        self.0
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

/// Run the broadcast loop until the client goes away.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let (sender, mut receiver) = socket.split();

    // Resolves once the client sends a close frame or the stream ends.
    // Inbound text and binary frames are ignored.
    let closed = async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("WebSocket error: {e}");
                    break;
                }
                Ok(_) => {}
            }
        }
    };

    let reason = BroadcastLoop::new(Arc::clone(&state.monitor))
        .run(WsSink(sender), closed)
        .await;
    debug!(?reason, "WebSocket client disconnected");
}

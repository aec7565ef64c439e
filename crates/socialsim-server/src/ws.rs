//! `WebSocket` handler for real-time turn streaming.
//!
//! Clients connect to `GET /ws/turns` and receive every committed
//! [`TurnRecord`](socialsim_types::TurnRecord) as a JSON text frame, from
//! manual steps and the background loop alike.
//!
//! A client that falls behind skips the records it missed and can
//! backfill them from `GET /api/history?since=N`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use socialsim_core::TextGenerator;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming turns.
///
/// # Route
///
/// `GET /ws/turns`
pub async fn ws_turns<G: TextGenerator>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Subscribe to the turn channel and forward each record until either
/// side goes away.
async fn handle_ws<G: TextGenerator>(mut socket: WebSocket, state: Arc<AppState<G>>) {
    debug!("WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(record) => {
                        let json = match serde_json::to_string(&record) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize turn record: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Turn channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

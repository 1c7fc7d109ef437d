//! WebSocket handler: one relay session per socket.
//!
//! DESIGN
//! ======
//! On upgrade the socket registers with the hub and enters a `select!` loop:
//! - inbound text or binary message -> fan out to every other session
//! - message queued by a peer -> forward to this socket
//!
//! There is no welcome frame and no history replay. Ping and pong are
//! answered by the transport and never relayed.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade -> `Hub::connect`
//! 2. Inbound messages -> `process_inbound` -> `Hub::broadcast`
//! 3. Close, receive error, or send error -> `Hub::disconnect`

use std::ops::ControlFlow;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{debug, info, warn};

use crate::hub::{Hub, Relayed, SessionId};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let (session_id, mut peer_rx) = state.hub.connect().await;
    let sessions = state.hub.session_count().await;
    info!(%session_id, sessions, "ws: session connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(%session_id, error = %e, "ws: receive failed");
                        break;
                    }
                    None => break,
                };
                if process_inbound(&state.hub, session_id, msg).await.is_break() {
                    break;
                }
            }
            Some(relayed) = peer_rx.recv() => {
                if let Err(e) = socket.send(relayed.into()).await {
                    warn!(%session_id, error = %e, "ws: send failed");
                    break;
                }
            }
        }
    }

    state.hub.disconnect(session_id).await;
    let sessions = state.hub.session_count().await;
    info!(%session_id, sessions, "ws: session disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Handle one inbound socket message. Breaks when the session should end.
///
/// Kept apart from the socket loop so tests can drive the hub without a
/// live connection.
pub(crate) async fn process_inbound(hub: &Hub, session_id: SessionId, msg: Message) -> ControlFlow<()> {
    let relayed = match msg {
        Message::Text(text) => Relayed::Text(text),
        Message::Binary(bytes) => Relayed::Binary(bytes),
        Message::Close(_) => return ControlFlow::Break(()),
        Message::Ping(_) | Message::Pong(_) => return ControlFlow::Continue(()),
    };

    let event_type = relayed.event_type();
    let bytes = relayed.len();
    let fan_out = hub.broadcast(session_id, &relayed).await;

    let continuous = event_type
        .as_deref()
        .and_then(frames::EventType::parse)
        .is_some_and(frames::EventType::is_continuous);
    let event_type = event_type.as_deref().unwrap_or("-");
    if continuous {
        debug!(%session_id, event_type, bytes, delivered = fan_out.delivered, dropped = fan_out.dropped, "ws: relayed");
    } else {
        info!(%session_id, event_type, bytes, delivered = fan_out.delivered, dropped = fan_out.dropped, "ws: relayed");
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

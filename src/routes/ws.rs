//! WebSocket handler — one connection per player seat.
//!
//! DESIGN
//! ======
//! On upgrade the connection is attached to the slot owned by its `pid`
//! cookie, then enters a `select!` loop:
//! - Incoming text → decode a proposed board → `services::game::submit_move`
//! - Outbound channel → forward `game_state` / `info` to the client
//!
//! The handler never writes to another player's socket. All fan-out goes
//! through the per-connection channels installed on the match slots.
//!
//! LIFECYCLE
//! =========
//! 1. Refuse the upgrade for an unknown match or a missing identity
//! 2. Upgrade → `session::attach` (may displace an older connection)
//! 3. Loop until the client closes, sends an undecodable message, the
//!    match disappears, or a newer connection takes over the seat
//! 4. `session::detach` once, with the seat and connection ID captured at
//!    attach time

use std::ops::ControlFlow;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{ErrorCode, MoveRequest, Outbound, ServerMessage};
use crate::routes::matches::identity_from;
use crate::services;
use crate::state::{AppState, MatchId};

/// Outbound queue depth per connection.
const OUTBOUND_CAPACITY: usize = 64;

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /ws/{id}`: attach a player connection to a match.
pub async fn handle_ws(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Response {
    let match_id = MatchId::from(id);
    if services::registry::get(&state, &match_id).await.is_none() {
        return (StatusCode::NOT_FOUND, "match not found").into_response();
    }

    let Some(identity) = identity_from(&jar) else {
        warn!(%match_id, "ws: connection without player identity");
        return (StatusCode::UNAUTHORIZED, "player identity required").into_response();
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, match_id, identity))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, match_id: MatchId, identity: String) {
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);

    let player = match services::session::attach(&state, &match_id, &identity, conn_id, tx).await {
        Ok(player) => player,
        Err(e) => {
            warn!(%match_id, %conn_id, code = e.error_code(), error = %e, "ws: attach failed");
            close_socket(&mut socket, &match_id, conn_id).await;
            return;
        }
    };

    info!(%match_id, %conn_id, pid = %identity, player = ?player, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(%match_id, %conn_id, error = %e, "ws: read failed");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        if handle_text(&state, &match_id, conn_id, text.as_str()).await.is_break() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outbound = rx.recv(), if player.is_some() => {
                match outbound {
                    Some(Outbound::Message(msg)) => send_message(&mut socket, &match_id, conn_id, &msg).await,
                    Some(Outbound::Close) | None => {
                        info!(%match_id, %conn_id, "ws: seat taken over by a newer connection");
                        close_socket(&mut socket, &match_id, conn_id).await;
                        break;
                    }
                }
            }
        }
    }

    if let Some(player) = player {
        services::session::detach(&state, &match_id, player, conn_id).await;
    }
    info!(%match_id, %conn_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Decode and submit one move. `Break` ends the connection.
async fn handle_text(state: &AppState, match_id: &MatchId, conn_id: Uuid, text: &str) -> ControlFlow<()> {
    let request = match MoveRequest::parse(text) {
        Ok(request) => request,
        Err(e) => {
            warn!(%match_id, %conn_id, error = %e, "ws: undecodable move message");
            return ControlFlow::Break(());
        }
    };

    match services::game::submit_move(state, match_id, conn_id, request).await {
        Ok(_) => ControlFlow::Continue(()),
        Err(e) => {
            info!(%match_id, %conn_id, code = e.error_code(), error = %e, "ws: ending connection");
            ControlFlow::Break(())
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Write one message to the socket. Failures are logged and the connection
/// stays up; a dead socket surfaces on the next read.
async fn send_message(socket: &mut WebSocket, match_id: &MatchId, conn_id: Uuid, msg: &ServerMessage) {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!(%match_id, %conn_id, error = %e, "ws: failed to serialize message");
            return;
        }
    };
    if let Err(e) = socket.send(Message::Text(json.into())).await {
        warn!(%match_id, %conn_id, kind = msg.kind(), error = %e, "ws: send failed");
    }
}

async fn close_socket(socket: &mut WebSocket, match_id: &MatchId, conn_id: Uuid) {
    if let Err(e) = socket.send(Message::Close(None)).await {
        debug!(%match_id, %conn_id, error = %e, "ws: close frame not sent");
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

//! Turn enforcement, move application, and fan-out to both seats.
//!
//! DESIGN
//! ======
//! `submit_move` holds the match lock for the whole
//! authorize → apply → flip turn → evaluate → broadcast sequence.
//! Delivery is `try_send` onto each seat's connection channel, so the lock
//! is never held across socket I/O and one slow or dead seat cannot stall
//! the other.
//!
//! TURN RULES
//! ==========
//! - Only the connection currently installed on the `next_move` seat may
//!   move; anything else is dropped without a reply.
//! - Once authorized, the turn flips even if the proposal claimed nothing
//!   (resubmitted board, overwrite attempt, out-of-range values).
//! - A decided game is still reported as decided but does not block moves.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::{self, Outcome, Player};
use crate::protocol::{ErrorCode, MoveRequest, Outbound, ServerMessage};
use crate::services::registry::{self, MatchError};
use crate::state::{AppState, Match, MatchId};

/// Result of one inbound move message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// Sender does not hold the turn; nothing changed.
    Discarded,
    /// Turn consumed. `claimed` is the cell index set, if any.
    Applied { claimed: Option<usize>, outcome: Outcome, next_move: Player },
}

/// Process one proposal from connection `conn_id`.
///
/// # Errors
///
/// `NotFound` if the match no longer exists; the caller should end the
/// connection.
pub async fn submit_move(
    state: &AppState,
    match_id: &MatchId,
    conn_id: Uuid,
    request: MoveRequest,
) -> Result<MoveResult, MatchError> {
    let game = registry::get(state, match_id)
        .await
        .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;
    let mut game = game.lock().await;

    let mover = game.next_move;
    if !game.slot(mover).holds_connection(conn_id) {
        debug!(
            %match_id,
            %conn_id,
            sender = ?game.player_for_connection(conn_id),
            next_move = %mover,
            "move out of turn; discarded"
        );
        return Ok(MoveResult::Discarded);
    }

    let claimed = match board::apply_values(&mut game.board, &request.0) {
        Ok(claimed) => claimed,
        Err(e) => {
            warn!(%match_id, %conn_id, code = e.error_code(), error = %e, "proposal rejected");
            None
        }
    };
    game.next_move = mover.other();
    game.touch();

    let outcome = board::evaluate(&game.board);
    broadcast(&game, &ServerMessage::game_state(game.board, outcome, game.next_move));

    info!(
        %match_id,
        player = %mover,
        claimed = ?claimed,
        result = i8::from(outcome),
        next_move = %game.next_move,
        "move processed"
    );
    if outcome.is_terminal() {
        info!(%match_id, result = i8::from(outcome), "match decided");
    }
    Ok(MoveResult::Applied { claimed, outcome, next_move: game.next_move })
}

/// Current board, outcome, and turn as a `game_state` message.
#[must_use]
pub fn snapshot(game: &Match) -> ServerMessage {
    ServerMessage::game_state(game.board, board::evaluate(&game.board), game.next_move)
}

/// Queue `msg` for `player`'s live connection. Returns whether it was
/// queued; a detached seat is skipped silently.
pub fn send_to(game: &Match, player: Player, msg: ServerMessage) -> bool {
    let Some(conn) = &game.slot(player).conn else {
        return false;
    };
    let kind = msg.kind();
    match conn.tx.try_send(Outbound::Message(msg)) {
        Ok(()) => true,
        Err(e) => {
            warn!(match_id = %game.id, conn_id = %conn.conn_id, %player, kind, error = %e, "dropped outbound message");
            false
        }
    }
}

/// Queue `msg` for both seats independently.
pub fn broadcast(game: &Match, msg: &ServerMessage) {
    for player in [Player::One, Player::Two] {
        send_to(game, player, msg.clone());
    }
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;

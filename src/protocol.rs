//! Wire messages exchanged over the match websocket.
//!
//! ARCHITECTURE
//! ============
//! Server → client messages are JSON objects tagged by `type`:
//! - `game_state`: full board, outcome, and whose turn is next
//! - `info`: human-readable notice (waiting, opponent disconnected)
//!
//! Client → server messages are a bare 9-element integer array: the
//! client's proposed full board. Values are kept as raw integers here so
//! out-of-range cells reach the move applier instead of failing decode.
//!
//! Connection tasks receive `Outbound` items over their mpsc channel. The
//! `Close` control tells a displaced connection to shut down.

use serde::{Deserialize, Serialize};

use crate::board::{Board, CELL_COUNT, Outcome, Player};

/// Sent to a newly attached player while the other seat has no connection.
pub const INFO_WAITING: &str = "waiting for other player to join";

/// Sent to the remaining player when the opponent's live connection closes.
pub const INFO_OPPONENT_DISCONNECTED: &str = "Other player got disconnected";

/// Errors that carry a grepable code for structured logs and HTTP mapping.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// SERVER MESSAGES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState {
        state: Board,
        result: Outcome,
        #[serde(rename = "nextMove")]
        next_move: Player,
    },
    Info {
        msg: String,
    },
}

impl ServerMessage {
    #[must_use]
    pub fn game_state(board: Board, result: Outcome, next_move: Player) -> Self {
        Self::GameState { state: board, result, next_move }
    }

    #[must_use]
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info { msg: msg.into() }
    }

    /// Short label for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameState { .. } => "game_state",
            Self::Info { .. } => "info",
        }
    }
}

// =============================================================================
// CLIENT MESSAGES
// =============================================================================

/// A client's proposed full board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveRequest(pub [i64; CELL_COUNT]);

impl MoveRequest {
    /// Decode one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not an array of exactly nine
    /// integers.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// CONNECTION CHANNEL
// =============================================================================

/// Items queued to a connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(ServerMessage),
    /// The slot was taken over by a newer connection.
    Close,
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;

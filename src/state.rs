//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the match registry: a map from match ID to a per-match mutex.
//! The outer `RwLock` only guards membership (insert / lookup / evict);
//! every read-modify-write of a match's board, turn, or slot connections
//! happens under that match's own `Mutex`, so two matches never contend
//! and the two players of one match are serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::board::{Board, Player};
use crate::config::Config;
use crate::protocol::Outbound;

// =============================================================================
// MATCH ID
// =============================================================================

/// Opaque registry key handed to clients in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl From<String> for MatchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MatchId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// PLAYER SLOT
// =============================================================================

/// Live connection installed on a slot.
#[derive(Debug, Clone)]
pub struct SlotConnection {
    pub conn_id: Uuid,
    pub tx: mpsc::Sender<Outbound>,
}

/// One match seat: who owns it and, if attached, their live connection.
#[derive(Debug, Clone, Default)]
pub struct PlayerSlot {
    pub identity: Option<String>,
    pub conn: Option<SlotConnection>,
}

impl PlayerSlot {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    #[must_use]
    pub fn holds_identity(&self, identity: &str) -> bool {
        self.identity.as_deref() == Some(identity)
    }

    #[must_use]
    pub fn holds_connection(&self, conn_id: Uuid) -> bool {
        self.conn.as_ref().is_some_and(|c| c.conn_id == conn_id)
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// One game instance.
#[derive(Debug)]
pub struct Match {
    pub id: MatchId,
    slots: [PlayerSlot; 2],
    pub board: Board,
    pub next_move: Player,
    /// Last create / join / attach / move / reset. Drives idle eviction.
    pub last_activity: Instant,
}

impl Match {
    #[must_use]
    pub fn new(id: MatchId, creator: String) -> Self {
        Self {
            id,
            slots: [PlayerSlot { identity: Some(creator), conn: None }, PlayerSlot::default()],
            board: Board::new(),
            next_move: Player::One,
            last_activity: Instant::now(),
        }
    }

    #[must_use]
    pub fn slot(&self, player: Player) -> &PlayerSlot {
        &self.slots[slot_index(player)]
    }

    pub fn slot_mut(&mut self, player: Player) -> &mut PlayerSlot {
        &mut self.slots[slot_index(player)]
    }

    /// Seat owned by `identity`. Slot one is checked first.
    #[must_use]
    pub fn player_for_identity(&self, identity: &str) -> Option<Player> {
        [Player::One, Player::Two]
            .into_iter()
            .find(|p| self.slot(*p).holds_identity(identity))
    }

    /// Seat whose currently installed connection is `conn_id`.
    #[must_use]
    pub fn player_for_connection(&self, conn_id: Uuid) -> Option<Player> {
        [Player::One, Player::Two]
            .into_iter()
            .find(|p| self.slot(*p).holds_connection(conn_id))
    }

    #[must_use]
    pub fn both_connected(&self) -> bool {
        self.slots.iter().all(PlayerSlot::is_connected)
    }

    #[must_use]
    pub fn any_connected(&self) -> bool {
        self.slots.iter().any(PlayerSlot::is_connected)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

fn slot_index(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

/// Registry entry. Each match is locked independently.
pub type SharedMatch = Arc<Mutex<Match>>;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub matches: Arc<RwLock<HashMap<MatchId, SharedMatch>>>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { matches: Arc::new(RwLock::new(HashMap::new())), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

//! Match registry — create, lookup, join, reset, and idle eviction.
//!
//! DESIGN
//! ======
//! Matches live only in process memory. IDs are short random strings over
//! an alphabet without look-alike characters; a colliding ID is redrawn a
//! bounded number of times.
//!
//! Eviction is opt-in. When `MATCH_IDLE_TTL_SECS` is set, a background task
//! drops matches that have had no activity for the TTL and have no live
//! connection. Otherwise matches are kept for the life of the process.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::board::{Board, Outcome, Player, evaluate};
use crate::protocol::ErrorCode;
use crate::services::session;
use crate::state::{AppState, Match, MatchId, SharedMatch};

/// Length of generated match IDs.
pub const MATCH_ID_LENGTH: usize = 8;

const MAX_CREATE_ATTEMPTS: usize = 16;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match not found: {0}")]
    NotFound(MatchId),
    #[error("player identity required")]
    MissingIdentity,
    #[error("no free match id after {0} attempts")]
    IdSpaceExhausted(usize),
}

impl ErrorCode for MatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_MATCH_NOT_FOUND",
            Self::MissingIdentity => "E_MISSING_IDENTITY",
            Self::IdSpaceExhausted(_) => "E_ID_SPACE_EXHAUSTED",
        }
    }
}

/// What a player sees when opening a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub player: Player,
    pub board: Board,
    pub outcome: Outcome,
    pub next_move: Player,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create a match owned by `identity` and return its ID.
///
/// # Errors
///
/// `MissingIdentity` for an empty identity; `IdSpaceExhausted` if every
/// drawn ID is already taken.
pub async fn create(state: &AppState, identity: &str) -> Result<MatchId, MatchError> {
    if identity.is_empty() {
        return Err(MatchError::MissingIdentity);
    }

    let mut matches = state.matches.write().await;
    for _ in 0..MAX_CREATE_ATTEMPTS {
        let match_id = MatchId::from(session::random_token(MATCH_ID_LENGTH));
        match matches.entry(match_id.clone()) {
            Entry::Occupied(_) => warn!(%match_id, "match id collision; redrawing"),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Match::new(match_id.clone(), identity.to_owned()))));
                info!(%match_id, pid = identity, "match created");
                return Ok(match_id);
            }
        }
    }
    Err(MatchError::IdSpaceExhausted(MAX_CREATE_ATTEMPTS))
}

/// Look up a match handle.
pub async fn get(state: &AppState, match_id: &MatchId) -> Option<SharedMatch> {
    state.matches.read().await.get(match_id).cloned()
}

/// Open a match as `identity`. The creator keeps slot one; any other
/// identity takes slot two, replacing whoever held it before.
///
/// # Errors
///
/// `NotFound` for an unknown ID; `MissingIdentity` for an empty identity.
pub async fn join(state: &AppState, match_id: &MatchId, identity: &str) -> Result<MatchView, MatchError> {
    if identity.is_empty() {
        return Err(MatchError::MissingIdentity);
    }
    let game = get(state, match_id)
        .await
        .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;
    let mut game = game.lock().await;

    let player = if game.slot(Player::One).holds_identity(identity) {
        Player::One
    } else {
        let slot = game.slot_mut(Player::Two);
        if !slot.holds_identity(identity) {
            if let Some(previous) = slot.identity.replace(identity.to_owned()) {
                info!(%match_id, previous, pid = identity, "slot two reassigned");
            } else {
                info!(%match_id, pid = identity, "slot two bound");
            }
        }
        Player::Two
    };
    game.touch();

    Ok(MatchView { player, board: game.board, outcome: evaluate(&game.board), next_move: game.next_move })
}

/// Clear the board in place. Turn and slots are untouched.
///
/// # Errors
///
/// `NotFound` for an unknown ID.
pub async fn reset(state: &AppState, match_id: &MatchId) -> Result<(), MatchError> {
    let game = get(state, match_id)
        .await
        .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;
    let mut game = game.lock().await;
    game.board.clear();
    game.touch();
    info!(%match_id, next_move = %game.next_move, "match board reset");
    Ok(())
}

// =============================================================================
// EVICTION
// =============================================================================

/// Remove matches idle for at least `ttl` with no live connection.
/// Returns how many were removed.
pub async fn evict_idle(state: &AppState, ttl: Duration) -> usize {
    let now = Instant::now();
    let mut matches = state.matches.write().await;
    let before = matches.len();

    // A match whose lock is held is in use right now, so it is not idle.
    matches.retain(|match_id, game| {
        let Ok(game) = game.try_lock() else {
            return true;
        };
        let expired = !game.any_connected() && now.duration_since(game.last_activity) >= ttl;
        if expired {
            info!(%match_id, "evicting idle match");
        }
        !expired
    });

    before - matches.len()
}

/// Spawn the background eviction task. Returns `None` when eviction is
/// disabled.
pub fn spawn_eviction_task(state: AppState) -> Option<JoinHandle<()>> {
    let ttl = state.config.match_idle_ttl?;
    let period = state.config.sweep_interval;
    info!(ttl_secs = ttl.as_secs(), sweep_secs = period.as_secs(), "match eviction enabled");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = evict_idle(&state, ttl).await;
            if evicted > 0 {
                info!(evicted, "idle matches evicted");
            }
        }
    }))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

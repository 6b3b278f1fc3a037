//! Player identities and the connection handshake.
//!
//! ARCHITECTURE
//! ============
//! Identities are opaque strings issued by the HTTP layer (a `pid` cookie)
//! and passed into `attach` explicitly. A connection is bound to whichever
//! slot holds its identity.
//!
//! HANDSHAKE
//! =========
//! Under the match lock:
//! 1. Resolve the slot by identity (none → unaffiliated, nothing installed)
//! 2. Tell any previous connection on that slot to close, then replace it
//! 3. Send `info` "waiting" to the new connection if the other seat is empty
//! 4. Broadcast `game_state` once both seats are connected
//!
//! `detach` runs once per connection after its receive loop ends. It only
//! acts if the connection is still the one installed, so a connection that
//! was displaced by a reconnect never clears its successor.

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::board::Player;
use crate::protocol::{INFO_OPPONENT_DISCONNECTED, INFO_WAITING, Outbound, ServerMessage};
use crate::services::game;
use crate::services::registry::{self, MatchError};
use crate::state::{AppState, MatchId, SlotConnection};

/// Alphabet for generated IDs. Omits `i`, `l`, `x`, `y`.
const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghjkmnopqrstuvwz";

/// Length of generated player identities.
pub const PLAYER_ID_LENGTH: usize = 8;

/// Random string of `len` characters from the unambiguous alphabet.
#[must_use]
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Issue a fresh player identity.
#[must_use]
pub fn generate_player_id() -> String {
    random_token(PLAYER_ID_LENGTH)
}

/// Bind a new connection to the slot owned by `identity`.
///
/// Returns the bound seat, or `None` when the identity owns neither seat.
/// In that case `tx` is dropped and the connection is never addressed.
///
/// # Errors
///
/// `MissingIdentity` for an empty identity; `NotFound` for an unknown match.
pub async fn attach(
    state: &AppState,
    match_id: &MatchId,
    identity: &str,
    conn_id: Uuid,
    tx: mpsc::Sender<Outbound>,
) -> Result<Option<Player>, MatchError> {
    if identity.is_empty() {
        return Err(MatchError::MissingIdentity);
    }
    let game = registry::get(state, match_id)
        .await
        .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;
    let mut game = game.lock().await;

    let Some(player) = game.player_for_identity(identity) else {
        info!(%match_id, %conn_id, pid = identity, "connection matches no slot; left unaffiliated");
        return Ok(None);
    };

    if let Some(previous) = game.slot_mut(player).conn.take() {
        info!(%match_id, %player, old_conn = %previous.conn_id, new_conn = %conn_id, "replacing slot connection");
        if previous.tx.try_send(Outbound::Close).is_err() {
            debug!(%match_id, old_conn = %previous.conn_id, "previous connection already gone");
        }
    }
    game.slot_mut(player).conn = Some(SlotConnection { conn_id, tx });
    game.touch();

    if !game.slot(player.other()).is_connected() {
        game::send_to(&game, player, ServerMessage::info(INFO_WAITING));
    }
    if game.both_connected() {
        game::broadcast(&game, &game::snapshot(&game));
    }

    info!(%match_id, %conn_id, %player, "connection attached");
    Ok(Some(player))
}

/// Release `player`'s slot if `conn_id` is still installed there, and tell
/// the other seat.
pub async fn detach(state: &AppState, match_id: &MatchId, player: Player, conn_id: Uuid) {
    let Some(game) = registry::get(state, match_id).await else {
        return;
    };
    let mut game = game.lock().await;

    if !game.slot(player).holds_connection(conn_id) {
        debug!(%match_id, %conn_id, %player, "detach skipped; connection already replaced");
        return;
    }

    game::send_to(&game, player.other(), ServerMessage::info(INFO_OPPONENT_DISCONNECTED));
    game.slot_mut(player).conn = None;
    game.touch();
    info!(%match_id, %conn_id, %player, "connection detached");
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

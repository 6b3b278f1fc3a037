//! Match routes — player cookie, create, open, reset.
//!
//! Identity is the `pid` cookie. Handlers read it here and pass it to the
//! services as a plain string; nothing below this layer sees cookies.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use time::Duration;
use tracing::{error, warn};

use crate::board::{Board, Outcome, Player};
use crate::protocol::ErrorCode;
use crate::services::registry::{self, MatchError};
use crate::services::session;
use crate::state::{AppState, MatchId};

pub(crate) const PID_COOKIE: &str = "pid";

const PID_COOKIE_DAYS: i64 = 365;

// =============================================================================
// IDENTITY
// =============================================================================

/// Player identity from the request cookies, if present and non-empty.
pub(crate) fn identity_from(jar: &CookieJar) -> Option<String> {
    jar.get(PID_COOKIE)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Return the caller's identity, issuing a fresh `pid` cookie when missing.
fn ensure_identity(jar: CookieJar) -> (CookieJar, String) {
    if let Some(pid) = identity_from(&jar) {
        return (jar, pid);
    }
    let pid = session::generate_player_id();
    let cookie = Cookie::build((PID_COOKIE, pid.clone()))
        .path("/")
        .max_age(Duration::days(PID_COOKIE_DAYS));
    (jar.add(cookie), pid)
}

pub(crate) fn match_error_to_status(err: &MatchError) -> StatusCode {
    match err {
        MatchError::NotFound(_) => StatusCode::NOT_FOUND,
        MatchError::MissingIdentity => StatusCode::UNAUTHORIZED,
        MatchError::IdSpaceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn redirect_home() -> Response {
    Redirect::temporary("/").into_response()
}

fn match_path(match_id: &MatchId) -> String {
    format!("/gb/{match_id}")
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    pub player_id: String,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub match_id: MatchId,
    pub play_value: Player,
    pub state: Board,
    pub result: Outcome,
    pub next_move: Player,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`: make sure the caller has a player identity.
pub async fn index(jar: CookieJar) -> impl IntoResponse {
    let (jar, player_id) = ensure_identity(jar);
    (jar, Json(PlayerResponse { player_id }))
}

/// `POST /gb/new`: create a match owned by the caller and go to it.
pub async fn create_match(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(identity) = identity_from(&jar) else {
        warn!("create match without player identity");
        return Redirect::to("/").into_response();
    };

    match registry::create(&state, &identity).await {
        Ok(match_id) => Redirect::to(&match_path(&match_id)).into_response(),
        Err(e) => {
            error!(code = e.error_code(), error = %e, "create match failed");
            (match_error_to_status(&e), e.to_string()).into_response()
        }
    }
}

/// `GET /gb/{id}`: open a match, taking slot two if the caller is not the
/// creator.
pub async fn show_match(State(state): State<AppState>, Path(id): Path<String>, jar: CookieJar) -> Response {
    let match_id = MatchId::from(id);
    if registry::get(&state, &match_id).await.is_none() {
        return redirect_home();
    }

    let (jar, identity) = ensure_identity(jar);
    match registry::join(&state, &match_id, &identity).await {
        Ok(view) => {
            let body = MatchResponse {
                match_id,
                play_value: view.player,
                state: view.board,
                result: view.outcome,
                next_move: view.next_move,
            };
            (jar, Json(body)).into_response()
        }
        Err(MatchError::NotFound(_)) => redirect_home(),
        Err(e) => (match_error_to_status(&e), e.to_string()).into_response(),
    }
}

/// `GET /gb/{id}/reset`: clear the board and go back to the match.
pub async fn reset_match(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let match_id = MatchId::from(id);
    match registry::reset(&state, &match_id).await {
        Ok(()) => Redirect::to(&match_path(&match_id)).into_response(),
        Err(MatchError::NotFound(_)) => redirect_home(),
        Err(e) => (match_error_to_status(&e), e.to_string()).into_response(),
    }
}

#[cfg(test)]
#[path = "matches_test.rs"]
mod tests;

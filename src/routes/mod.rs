//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the match HTTP endpoints and the per-match websocket under one
//! Axum router. Page rendering is not part of this server: the match
//! endpoints answer with JSON that a front end can render.

pub mod matches;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(matches::index))
        .route("/gb/new", post(matches::create_match))
        .route("/gb/{id}", get(matches::show_match))
        .route("/gb/{id}/reset", get(matches::reset_match))
        .route("/ws/{id}", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own match state transitions so route handlers can stay
//! focused on protocol translation and cookie plumbing.
//!
//! - `registry`: create / look up / join / reset / evict matches
//! - `session`: player identities and the connection handshake
//! - `game`: turn enforcement, move application, and fan-out

pub mod game;
pub mod registry;
pub mod session;

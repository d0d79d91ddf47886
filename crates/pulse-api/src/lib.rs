//! # pulse-api
//!
//! HTTP transport layer for Pulse built on Axum.
//!
//! Provides the WebSocket upgrade endpoint that bridges client sessions to
//! the gateway engine, plus the health and stats surfaces.

pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;

//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use pulse_core::traits::store::PresenceStore;

use crate::state::AppState;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since the engine started.
    pub uptime_seconds: u64,
    /// Presence store reachability.
    pub store: String,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state.store.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.engine.stats().uptime_seconds,
        store: if store_ok { "connected" } else { "unreachable" }.to_string(),
    })
}

//! Gateway statistics handler.

use axum::Json;
use axum::extract::State;

use pulse_realtime::stats::GatewayStats;

use crate::state::AppState;

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<GatewayStats> {
    Json(state.engine.stats())
}

//! Application state shared across all handlers.

use std::sync::Arc;

use pulse_core::config::AppConfig;
use pulse_realtime::GatewayEngine;
use pulse_store::StoreManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The gateway engine.
    pub engine: Arc<GatewayEngine>,
    /// Presence store (for health checks).
    pub store: Arc<StoreManager>,
}

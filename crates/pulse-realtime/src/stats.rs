//! Observability snapshot of the gateway.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Point-in-time gateway statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStats {
    /// Number of live connections.
    pub total_connections: usize,
    /// Per-topic member counts.
    pub room_stats: HashMap<String, usize>,
    /// Seconds since the engine started.
    pub uptime_seconds: u64,
}

//! Gateway engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time gateway engine configuration.
///
/// Every timing and threshold the engine uses comes from here so that
/// tests can shrink them without touching the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Errors attributed to one identity before a temporary ban.
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
    /// Temporary ban duration in seconds.
    #[serde(default = "default_ban_seconds")]
    pub ban_seconds: u64,
    /// Period of the coarse error-counter reset cycle, in seconds.
    #[serde(default = "default_error_reset")]
    pub error_reset_seconds: u64,
    /// Liveness sweep period in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Idle time after which a connection is considered stale, in seconds.
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
    /// Maximum topics accepted in a single subscribe/unsubscribe request.
    #[serde(default = "default_max_topics")]
    pub max_topics_per_request: usize,
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Upper bound on the shutdown drain wait, in milliseconds.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
            ban_seconds: default_ban_seconds(),
            error_reset_seconds: default_error_reset(),
            sweep_interval_seconds: default_sweep_interval(),
            stale_after_seconds: default_stale_after(),
            max_topics_per_request: default_max_topics(),
            channel_buffer_size: default_channel_buffer(),
            drain_timeout_ms: default_drain_timeout(),
        }
    }
}

fn default_max_errors() -> u32 {
    5
}

fn default_ban_seconds() -> u64 {
    300
}

fn default_error_reset() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_stale_after() -> u64 {
    120
}

fn default_max_topics() -> usize {
    50
}

fn default_channel_buffer() -> usize {
    256
}

fn default_drain_timeout() -> u64 {
    5000
}

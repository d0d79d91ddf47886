//! Per-identity error counting with temporary ban escalation.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, error, warn};

use pulse_core::result::AppResult;
use pulse_core::traits::store::PresenceStore;
use pulse_store::{StoreManager, keys};

use crate::connection::handle::UserId;
use crate::connection::registry::ConnectionRegistry;

/// Counts errors attributed to identities and escalates to a temporary ban
/// once the threshold is reached.
///
/// Counters live in memory; the ban flag is externalized to the store with
/// a TTL so other processes (and future admissions) see it. The counter
/// increment is serialized per shard, so exactly one caller observes the
/// transition to the threshold and exactly one ban/disconnect happens even
/// when errors arrive concurrently.
#[derive(Debug)]
pub struct AbuseTracker {
    /// Identity → error count since the last reset.
    counts: DashMap<UserId, u32>,
    /// Errors before a ban.
    max_errors: u32,
    /// Ban duration.
    ban_ttl: Duration,
    /// Shared store holding ban flags.
    store: Arc<StoreManager>,
    /// Registry used for forced disconnection.
    registry: Arc<ConnectionRegistry>,
}

impl AbuseTracker {
    /// Creates a new tracker.
    pub fn new(
        max_errors: u32,
        ban_ttl: Duration,
        store: Arc<StoreManager>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            counts: DashMap::new(),
            max_errors,
            ban_ttl,
            store,
            registry,
        }
    }

    /// Records one error against an identity, banning it at the threshold.
    pub async fn record_error(&self, identity: UserId) {
        let count = {
            let mut entry = self.counts.entry(identity).or_insert(0);
            *entry += 1;
            *entry
        };
        debug!(identity = %identity, count, "Recorded error");

        if count == self.max_errors {
            self.ban(identity).await;
        }
    }

    async fn ban(&self, identity: UserId) {
        warn!(
            identity = %identity,
            threshold = self.max_errors,
            "Error threshold reached, installing temporary ban"
        );

        if let Err(e) = self
            .store
            .set_with_ttl(&keys::ban(identity), "1", self.ban_ttl)
            .await
        {
            // The session is still killed; only the cross-process flag is lost.
            error!(identity = %identity, error = %e, "Ban flag write failed");
        }

        self.registry.remove(&identity).await;
    }

    /// Whether an identity is currently banned.
    pub async fn is_banned(&self, identity: UserId) -> AppResult<bool> {
        self.store.exists(&keys::ban(identity)).await
    }

    /// Current error count for an identity (observability).
    pub fn error_count(&self, identity: UserId) -> u32 {
        self.counts.get(&identity).map(|e| *e).unwrap_or(0)
    }

    /// Clears every counter. Called by the periodic reset cycle.
    pub fn reset_all(&self) {
        self.counts.clear();
    }
}

/// Coarse reset cycle: clears all error counters every `period`.
///
/// Intentionally not a sliding window; changing this alters observable ban
/// timing for bursty clients.
pub async fn run_reset_cycle(
    tracker: Arc<AbuseTracker>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = time::interval(period);
    interval.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracker.reset_all();
                debug!("Cleared abuse counters");
            }
            _ = shutdown.recv() => {
                debug!("Abuse reset cycle stopping");
                break;
            }
        }
    }
}

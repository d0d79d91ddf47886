//! Liveness sweep that evicts idle connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;

/// Periodically scans the registry and force-disconnects stale connections.
///
/// A connection is stale once its last inbound activity is older than the
/// configured threshold. The sweep works on a snapshot and evicts each
/// connection independently, so one slow removal cannot stall the rest.
#[derive(Debug)]
pub struct LivenessMonitor {
    /// Registry to scan.
    registry: Arc<ConnectionRegistry>,
    /// Sweep period.
    sweep_interval: Duration,
    /// Idle threshold in milliseconds.
    stale_after_ms: i64,
}

impl LivenessMonitor {
    /// Creates a new monitor.
    pub fn new(registry: Arc<ConnectionRegistry>, sweep_interval: Duration, stale_after: Duration) -> Self {
        Self {
            registry,
            sweep_interval,
            stale_after_ms: stale_after.as_millis() as i64,
        }
    }

    /// Runs the sweep loop until the shutdown signal fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = time::interval(self.sweep_interval);
        interval.tick().await; // first tick completes immediately

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    debug!("Liveness monitor stopping");
                    break;
                }
            }
        }
    }

    /// Scans once and evicts every stale connection.
    pub async fn sweep(&self) {
        let now_ms = Utc::now().timestamp_millis();

        for handle in self.registry.snapshot() {
            let idle_ms = now_ms - handle.last_activity_ms();
            if idle_ms > self.stale_after_ms {
                warn!(
                    identity = %handle.identity,
                    conn_id = %handle.id,
                    idle_seconds = idle_ms / 1000,
                    "Evicting stale connection"
                );
                self.registry.remove_exact(&handle.identity, handle.id).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::manager::SubscriptionManager;
    use pulse_core::config::store::MemoryStoreConfig;
    use pulse_store::StoreManager;
    use pulse_store::memory::MemoryStore;
    use uuid::Uuid;

    fn registry() -> Arc<ConnectionRegistry> {
        let store = Arc::new(StoreManager::from_provider(Arc::new(MemoryStore::new(
            &MemoryStoreConfig { max_capacity: 1000 },
        ))));
        Arc::new(ConnectionRegistry::new(
            Arc::new(SubscriptionManager::new(50)),
            store,
            16,
        ))
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_connection() {
        let reg = registry();
        let monitor = LivenessMonitor::new(
            reg.clone(),
            Duration::from_secs(60),
            Duration::from_secs(120),
        );

        let id = Uuid::new_v4();
        let (handle, _rx) = reg.admit(id).await;
        handle.set_last_activity_ms(Utc::now().timestamp_millis() - 200_000);

        monitor.sweep().await;
        assert!(!reg.is_connected(&id));
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_connection() {
        let reg = registry();
        let monitor = LivenessMonitor::new(
            reg.clone(),
            Duration::from_secs(60),
            Duration::from_secs(120),
        );

        let id = Uuid::new_v4();
        let (handle, _rx) = reg.admit(id).await;
        handle.touch();

        monitor.sweep().await;
        assert!(reg.is_connected(&id));
    }
}

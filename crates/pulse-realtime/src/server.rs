//! Top-level gateway engine that ties together all subsystems.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use pulse_auth::TokenVerifier;
use pulse_core::config::gateway::GatewayConfig;
use pulse_store::StoreManager;

use crate::abuse::tracker::{AbuseTracker, run_reset_cycle};
use crate::connection::handle::{ConnectionHandle, UserId};
use crate::connection::liveness::LivenessMonitor;
use crate::connection::registry::ConnectionRegistry;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::gate::AdmissionGate;
use crate::message::types::{ClientMessage, ErrorBody, ServerMessage};
use crate::rooms::manager::SubscriptionManager;
use crate::stats::GatewayStats;

/// Central engine coordinating admission, rooms, abuse policing, liveness,
/// and dispatch.
#[derive(Debug)]
pub struct GatewayEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Subscription manager.
    pub rooms: Arc<SubscriptionManager>,
    /// Abuse tracker.
    pub abuse: Arc<AbuseTracker>,
    /// Producer-facing dispatcher.
    pub dispatcher: Arc<EventDispatcher>,
    /// Admission gate.
    pub gate: Arc<AdmissionGate>,
    /// Engine configuration.
    config: GatewayConfig,
    /// Engine start time for the uptime stat.
    started_at: Instant,
    /// Shutdown signal for background tasks.
    shutdown_tx: broadcast::Sender<()>,
}

impl GatewayEngine {
    /// Creates a new engine with all subsystems wired.
    pub fn new(
        config: GatewayConfig,
        verifier: Arc<TokenVerifier>,
        store: Arc<StoreManager>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let rooms = Arc::new(SubscriptionManager::new(config.max_topics_per_request));
        let registry = Arc::new(ConnectionRegistry::new(
            rooms.clone(),
            store.clone(),
            config.channel_buffer_size,
        ));
        let abuse = Arc::new(AbuseTracker::new(
            config.max_errors,
            Duration::from_secs(config.ban_seconds),
            store.clone(),
            registry.clone(),
        ));
        let dispatcher = Arc::new(EventDispatcher::new(
            registry.clone(),
            rooms.clone(),
            abuse.clone(),
        ));
        let gate = Arc::new(AdmissionGate::new(verifier, store, registry.clone()));

        info!("Gateway engine initialized");

        Self {
            registry,
            rooms,
            abuse,
            dispatcher,
            gate,
            config,
            started_at: Instant::now(),
            shutdown_tx,
        }
    }

    /// Spawns the liveness sweep and the abuse-counter reset cycle.
    pub fn start(&self) {
        let monitor = Arc::new(LivenessMonitor::new(
            self.registry.clone(),
            Duration::from_secs(self.config.sweep_interval_seconds),
            Duration::from_secs(self.config.stale_after_seconds),
        ));
        tokio::spawn(monitor.run(self.shutdown_tx.subscribe()));

        tokio::spawn(run_reset_cycle(
            self.abuse.clone(),
            Duration::from_secs(self.config.error_reset_seconds),
            self.shutdown_tx.subscribe(),
        ));

        info!("Gateway engine started");
    }

    /// Processes one inbound frame from a connected client.
    ///
    /// Every frame refreshes liveness, whatever its content. Parse and
    /// validation failures are acknowledged with a reason code and counted
    /// against the identity's abuse record.
    pub async fn handle_inbound(&self, identity: UserId, raw: &str) {
        let Some(handle) = self.registry.lookup(&identity) else {
            warn!(identity = %identity, "Frame from unknown connection");
            return;
        };

        handle.touch();

        let msg: ClientMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                debug!(identity = %identity, error = %e, "Unparseable frame");
                self.abuse.record_error(identity).await;
                self.reply(
                    &handle,
                    &ServerMessage::Error {
                        code: "INVALID_MESSAGE".to_string(),
                        message: format!("Failed to parse message: {e}"),
                    },
                );
                return;
            }
        };

        match msg {
            ClientMessage::Subscribe { topics } => {
                let result = self.rooms.join(identity, &topics);
                self.ack(&handle, identity, "subscribe", result).await;
            }
            ClientMessage::Unsubscribe { topics } => {
                let result = self.rooms.leave(identity, &topics);
                self.ack(&handle, identity, "unsubscribe", result).await;
            }
            ClientMessage::Ping => {
                self.reply(
                    &handle,
                    &ServerMessage::Pong {
                        timestamp: Utc::now().timestamp_millis(),
                    },
                );
            }
        }
    }

    async fn ack(
        &self,
        handle: &Arc<ConnectionHandle>,
        identity: UserId,
        op: &str,
        result: Result<(), crate::error::SubscribeError>,
    ) {
        let message = match result {
            Ok(()) => ServerMessage::Ack {
                op: op.to_string(),
                success: true,
                error: None,
            },
            Err(e) => {
                self.abuse.record_error(identity).await;
                ServerMessage::Ack {
                    op: op.to_string(),
                    success: false,
                    error: Some(ErrorBody {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        };
        self.reply(handle, &message);
    }

    fn reply(&self, handle: &Arc<ConnectionHandle>, message: &ServerMessage) {
        if let Ok(frame) = serde_json::to_string(message) {
            let _ = handle.send(frame);
        }
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            total_connections: self.registry.count(),
            room_stats: self.rooms.room_stats(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Whether an identity currently holds a live connection.
    pub fn is_connected(&self, identity: &UserId) -> bool {
        self.registry.is_connected(identity)
    }

    /// Snapshot of an identity's joined topics.
    pub fn subscriptions_of(&self, identity: UserId) -> HashSet<String> {
        self.rooms.topics_of(identity)
    }

    /// Returns a shutdown receiver for coordinating with external tasks.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Gracefully shuts the engine down.
    ///
    /// Stops accepting new connections, waits (bounded) for buffered
    /// outbound frames to flush, disconnects everyone, then stops the
    /// background tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down gateway engine");

        self.gate.close();
        self.dispatcher
            .drain(Duration::from_millis(self.config.drain_timeout_ms))
            .await;
        self.registry.disconnect_all().await;
        let _ = self.shutdown_tx.send(());

        info!("Gateway engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::auth::AuthConfig;
    use pulse_core::config::store::MemoryStoreConfig;
    use pulse_store::memory::MemoryStore;
    use serde_json::Value;
    use uuid::Uuid;

    fn engine() -> GatewayEngine {
        let store = Arc::new(StoreManager::from_provider(Arc::new(MemoryStore::new(
            &MemoryStoreConfig { max_capacity: 1000 },
        ))));
        let verifier = Arc::new(TokenVerifier::new(&AuthConfig::default()));
        GatewayEngine::new(GatewayConfig::default(), verifier, store)
    }

    async fn recv_json(rx: &mut tokio::sync::mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_ack() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        engine
            .handle_inbound(id, r#"{"type":"subscribe","topics":["transactions"]}"#)
            .await;

        let ack = recv_json(&mut rx).await;
        assert_eq!(ack["type"], "ack");
        assert_eq!(ack["op"], "subscribe");
        assert_eq!(ack["success"], true);
        assert!(engine.subscriptions_of(id).contains("transactions"));
    }

    #[tokio::test]
    async fn test_subscribe_validation_failure_acks_with_code() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        engine
            .handle_inbound(id, r#"{"type":"subscribe","topics":[]}"#)
            .await;

        let ack = recv_json(&mut rx).await;
        assert_eq!(ack["success"], false);
        assert_eq!(ack["error"]["code"], "INVALID_FORMAT");
        assert_eq!(engine.abuse.error_count(id), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_noop_for_unjoined_topic() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        engine
            .handle_inbound(id, r#"{"type":"unsubscribe","topics":["never"]}"#)
            .await;

        let ack = recv_json(&mut rx).await;
        assert_eq!(ack["success"], true);
        assert_eq!(engine.abuse.error_count(id), 0);
    }

    #[tokio::test]
    async fn test_unparseable_frame_counts_error() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        engine.handle_inbound(id, "{not json").await;

        let reply = recv_json(&mut rx).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "INVALID_MESSAGE");
        assert_eq!(engine.abuse.error_count(id), 1);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        engine.handle_inbound(id, r#"{"type":"ping"}"#).await;

        let reply = recv_json(&mut rx).await;
        assert_eq!(reply["type"], "pong");
        assert!(reply["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_inbound_refreshes_activity() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (handle, mut _rx) = engine.registry.admit(id).await;

        handle.set_last_activity_ms(0);
        engine.handle_inbound(id, r#"{"type":"ping"}"#).await;
        assert!(handle.last_activity_ms() > 0);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, _rx) = engine.registry.admit(id).await;
        engine
            .rooms
            .join(id, &["transactions".to_string()])
            .unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.room_stats.get("transactions"), Some(&1));
    }

    #[tokio::test]
    async fn test_shutdown_closes_gate_and_disconnects() {
        let engine = engine();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = engine.registry.admit(id).await;

        // Drain an empty buffer finishes immediately; consume nothing.
        let _ = rx.try_recv();
        engine.shutdown().await;

        assert!(!engine.gate.is_accepting());
        assert_eq!(engine.registry.count(), 0);
    }
}

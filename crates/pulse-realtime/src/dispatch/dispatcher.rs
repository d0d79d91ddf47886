//! Routes producer events to connected clients.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::abuse::tracker::AbuseTracker;
use crate::connection::handle::UserId;
use crate::connection::registry::ConnectionRegistry;
use crate::message::envelope::Envelope;
use crate::message::types::{
    EVENT_ACHIEVEMENT, EVENT_ANNOUNCEMENT, EVENT_FRAUD_ALERT, EVENT_LEARNING_UPDATE,
    EVENT_QUEST_UPDATE, EVENT_TRANSACTION_UPDATE,
};
use crate::rooms::manager::SubscriptionManager;

/// The public send/broadcast API used by upstream producers.
///
/// All operations are safe to call concurrently. Each call resolves its
/// recipients from the membership/registry snapshot taken at call time;
/// there is no ordering guarantee across calls.
#[derive(Debug)]
pub struct EventDispatcher {
    /// Connection lookup.
    registry: Arc<ConnectionRegistry>,
    /// Topic membership.
    rooms: Arc<SubscriptionManager>,
    /// Delivery-fault bookkeeping.
    abuse: Arc<AbuseTracker>,
}

impl EventDispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<SubscriptionManager>,
        abuse: Arc<AbuseTracker>,
    ) -> Self {
        Self {
            registry,
            rooms,
            abuse,
        }
    }

    /// Sends an event to one identity.
    ///
    /// Returns `false` when the identity has no live connection (offline
    /// delivery is a no-op, not a failure) or when delivery faults; a fault
    /// also counts against the identity's abuse record.
    pub async fn send_to_user(&self, identity: UserId, event: &str, payload: Option<Value>) -> bool {
        let envelope = Envelope::direct(event, payload);
        self.deliver(identity, &envelope).await
    }

    /// Fans an event out to every member of a topic.
    ///
    /// Offline members and delivery faults do not abort the remaining
    /// fan-out. Returns the number of members actually delivered to.
    pub async fn send_to_topic(&self, topic: &str, event: &str, payload: Option<Value>) -> usize {
        let members = self.rooms.members(topic);
        let mut delivered = 0;

        for identity in members {
            let envelope = Envelope::on_topic(topic, event, payload.clone());
            if self.deliver(identity, &envelope).await {
                delivered += 1;
            }
        }

        debug!(topic = %topic, event = %event, delivered, "Topic fan-out complete");
        delivered
    }

    /// Broadcasts an event to every connected client.
    ///
    /// The envelope is system-scoped so clients can tell broadcasts apart
    /// from personal notifications. No per-recipient acknowledgment is
    /// awaited; faults are logged only.
    pub async fn broadcast(&self, event: &str, payload: Option<Value>) -> usize {
        let envelope = Envelope::system(event, payload);
        let frame = match serde_json::to_string(&envelope) {
            Ok(f) => f,
            Err(e) => {
                error!(event = %event, error = %e, "Failed to serialize broadcast envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        for handle in self.registry.snapshot() {
            if handle.send(frame.clone()) {
                delivered += 1;
            }
        }

        debug!(event = %event, delivered, "Broadcast complete");
        delivered
    }

    /// Waits (bounded) until every connection's outbound buffer is empty.
    ///
    /// Called during graceful shutdown so in-flight notifications reach the
    /// transport before connections are torn down.
    pub async fn drain(&self, timeout: std::time::Duration) {
        let deadline = std::time::Instant::now() + timeout;

        loop {
            let pending: usize = self
                .registry
                .snapshot()
                .iter()
                .map(|h| h.pending_frames())
                .sum();
            if pending == 0 {
                break;
            }
            if std::time::Instant::now() >= deadline {
                tracing::warn!(pending, "Drain deadline reached with frames still buffered");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    async fn deliver(&self, identity: UserId, envelope: &Envelope) -> bool {
        let Some(handle) = self.registry.lookup(&identity) else {
            return false;
        };

        let frame = match serde_json::to_string(envelope) {
            Ok(f) => f,
            Err(e) => {
                error!(identity = %identity, error = %e, "Failed to serialize envelope");
                self.abuse.record_error(identity).await;
                return false;
            }
        };

        if handle.send(frame) {
            true
        } else {
            self.abuse.record_error(identity).await;
            false
        }
    }

    // ── Producer conveniences ──────────────────────────────────

    /// Sends a fraud-score alert to one identity.
    pub async fn send_fraud_alert(&self, identity: UserId, alert: Value) -> bool {
        self.send_to_user(identity, EVENT_FRAUD_ALERT, Some(alert)).await
    }

    /// Sends an achievement-unlocked notification to one identity.
    pub async fn send_achievement(&self, identity: UserId, achievement: Value) -> bool {
        self.send_to_user(identity, EVENT_ACHIEVEMENT, Some(achievement))
            .await
    }

    /// Sends a learning-progress update to one identity.
    pub async fn send_learning_update(&self, identity: UserId, update: Value) -> bool {
        self.send_to_user(identity, EVENT_LEARNING_UPDATE, Some(update))
            .await
    }

    /// Sends a transaction status update to one identity.
    pub async fn send_transaction_update(&self, identity: UserId, transaction: Value) -> bool {
        self.send_to_user(identity, EVENT_TRANSACTION_UPDATE, Some(transaction))
            .await
    }

    /// Sends a quest progress update to one identity.
    pub async fn send_quest_update(&self, identity: UserId, quest: Value) -> bool {
        self.send_to_user(identity, EVENT_QUEST_UPDATE, Some(quest)).await
    }

    /// Broadcasts a system announcement to everyone.
    pub async fn broadcast_announcement(&self, announcement: Value) -> usize {
        self.broadcast(EVENT_ANNOUNCEMENT, Some(announcement)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::store::MemoryStoreConfig;
    use pulse_store::StoreManager;
    use pulse_store::memory::MemoryStore;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn fixtures() -> (
        Arc<ConnectionRegistry>,
        Arc<SubscriptionManager>,
        EventDispatcher,
    ) {
        let store = Arc::new(StoreManager::from_provider(Arc::new(MemoryStore::new(
            &MemoryStoreConfig { max_capacity: 1000 },
        ))));
        let rooms = Arc::new(SubscriptionManager::new(50));
        let registry = Arc::new(ConnectionRegistry::new(rooms.clone(), store.clone(), 16));
        let abuse = Arc::new(AbuseTracker::new(
            5,
            std::time::Duration::from_secs(300),
            store,
            registry.clone(),
        ));
        let dispatcher = EventDispatcher::new(registry.clone(), rooms.clone(), abuse);
        (registry, rooms, dispatcher)
    }

    fn parse(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_send_to_offline_user_is_false() {
        let (_registry, _rooms, dispatcher) = fixtures();
        let delivered = dispatcher
            .send_to_user(Uuid::new_v4(), "fraud-alert", None)
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_send_to_user_delivers_envelope() {
        let (registry, _rooms, dispatcher) = fixtures();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = registry.admit(id).await;

        let delivered = dispatcher
            .send_to_user(id, "transaction-update", Some(serde_json::json!({"id": 7})))
            .await;
        assert!(delivered);

        let frame = rx.recv().await.unwrap();
        let value = parse(&frame);
        assert_eq!(value["type"], "transaction-update");
        assert_eq!(value["data"]["id"], 7);
        assert_eq!(value["scope"], "direct");
    }

    #[tokio::test]
    async fn test_absent_payload_still_delivers() {
        let (registry, _rooms, dispatcher) = fixtures();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = registry.admit(id).await;

        assert!(dispatcher.send_to_user(id, "quest-update", None).await);
        let value = parse(&rx.recv().await.unwrap());
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_topic_fanout_respects_membership() {
        let (registry, rooms, dispatcher) = fixtures();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let (_h1, mut rx1) = registry.admit(u1).await;
        let (_h2, mut rx2) = registry.admit(u2).await;

        rooms
            .join(u1, &["transactions".to_string(), "fraud-alerts".to_string()])
            .unwrap();
        rooms.join(u2, &["transactions".to_string()]).unwrap();

        let delivered = dispatcher
            .send_to_topic(
                "fraud-alerts",
                "fraud-alert",
                Some(serde_json::json!({"score": 0.9})),
            )
            .await;
        assert_eq!(delivered, 1);

        let value = parse(&rx1.recv().await.unwrap());
        assert_eq!(value["type"], "fraud-alert");
        assert_eq!(value["topic"], "fraud-alerts");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_restores_zero_deliveries() {
        let (registry, rooms, dispatcher) = fixtures();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = registry.admit(id).await;

        rooms.join(id, &["fraud-alerts".to_string()]).unwrap();
        rooms.leave(id, &["fraud-alerts".to_string()]).unwrap();

        let delivered = dispatcher.send_to_topic("fraud-alerts", "fraud-alert", None).await;
        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let (registry, rooms, dispatcher) = fixtures();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let (_h1, mut rx1) = registry.admit(u1).await;
        let (_h2, mut rx2) = registry.admit(u2).await;

        // Subscriptions are irrelevant for broadcast.
        rooms.join(u1, &["transactions".to_string()]).unwrap();

        let delivered = dispatcher
            .broadcast_announcement(serde_json::json!({"msg": "maintenance"}))
            .await;
        assert_eq!(delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            let value = parse(&rx.recv().await.unwrap());
            assert_eq!(value["type"], "system-announcement");
            assert_eq!(value["scope"], "system");
            assert_eq!(value["data"]["msg"], "maintenance");
        }
    }

    #[tokio::test]
    async fn test_partial_fanout_continues_past_offline_member() {
        let (registry, rooms, dispatcher) = fixtures();
        let online = Uuid::new_v4();
        let offline = Uuid::new_v4();
        let (_h, mut rx) = registry.admit(online).await;

        rooms.join(online, &["news".to_string()]).unwrap();
        // Membership without a live connection: the fan-out must skip it
        // and keep going.
        rooms.join(offline, &["news".to_string()]).unwrap();

        let delivered = dispatcher.send_to_topic("news", "learning-update", None).await;
        assert_eq!(delivered, 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_delivery_fault_counts_toward_abuse() {
        let (registry, _rooms, dispatcher) = fixtures();
        let id = Uuid::new_v4();
        let (_handle, rx) = registry.admit(id).await;
        drop(rx); // transport gone, delivery will fault

        let delivered = dispatcher.send_to_user(id, "fraud-alert", None).await;
        assert!(!delivered);
        assert_eq!(dispatcher.abuse.error_count(id), 1);
    }

    #[tokio::test]
    async fn test_repeated_faults_escalate_to_ban() {
        let (registry, _rooms, dispatcher) = fixtures();
        let id = Uuid::new_v4();
        let (_handle, rx) = registry.admit(id).await;
        drop(rx);

        for _ in 0..5 {
            dispatcher.send_to_user(id, "fraud-alert", None).await;
        }

        assert!(dispatcher.abuse.is_banned(id).await.unwrap());
        assert!(!registry.is_connected(&id));
    }
}

//! Connection registry — the single in-process source of truth for live
//! connections, keyed by identity.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use pulse_core::traits::store::PresenceStore;
use pulse_store::{StoreManager, keys};

use crate::rooms::manager::SubscriptionManager;

use super::handle::{ConnectionHandle, ConnectionId, UserId};

/// Presence record written to the shared store for each live connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Last activity, epoch milliseconds.
    pub last_active: i64,
    /// The in-process connection handle id.
    pub connection_handle: ConnectionId,
}

/// Owns all live connections and serializes per-identity lifecycle.
///
/// Admission, disconnection, and replacement all pass through here, so a
/// given identity's operations are ordered relative to each other. Removal
/// cascades to room cleanup and a best-effort presence delete; concurrent
/// disconnect triggers converge to a single cascade because only one caller
/// wins the map removal.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Identity → live connection handle.
    connections: DashMap<UserId, Arc<ConnectionHandle>>,
    /// Room membership, cleaned up on every removal.
    rooms: Arc<SubscriptionManager>,
    /// Shared presence store (best-effort bookkeeping).
    store: Arc<StoreManager>,
    /// Per-connection outbound buffer size.
    buffer_size: usize,
}

impl ConnectionRegistry {
    /// Creates a new registry.
    pub fn new(rooms: Arc<SubscriptionManager>, store: Arc<StoreManager>, buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            rooms,
            store,
            buffer_size,
        }
    }

    /// Admits an authenticated identity, returning the handle and the
    /// receiver the transport drains.
    ///
    /// An identity that is already connected gets last-writer-wins
    /// semantics: the prior connection is closed and its room memberships
    /// removed before the new session starts with a clean slate.
    pub async fn admit(&self, identity: UserId) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(identity, tx));

        if let Some(replaced) = self.connections.insert(identity, handle.clone()) {
            replaced.mark_closed();
            self.rooms.leave_all(identity);
            warn!(
                identity = %identity,
                old_conn = %replaced.id,
                new_conn = %handle.id,
                "Reconnect replaced an existing connection"
            );
        }

        let record = PresenceRecord {
            last_active: Utc::now().timestamp_millis(),
            connection_handle: handle.id,
        };
        if let Err(e) = self.store.set_json(&keys::presence(identity), &record).await {
            warn!(identity = %identity, error = %e, "Presence write failed, continuing");
        }

        info!(identity = %identity, conn_id = %handle.id, "Connection admitted");
        (handle, rx)
    }

    /// Looks up the live connection for an identity.
    pub fn lookup(&self, identity: &UserId) -> Option<Arc<ConnectionHandle>> {
        self.connections
            .get(identity)
            .map(|entry| entry.value().clone())
    }

    /// Removes an identity's connection, whatever it currently is.
    ///
    /// Returns `true` if this call performed the cascade.
    pub async fn remove(&self, identity: &UserId) -> bool {
        match self.connections.remove(identity) {
            Some((_, handle)) => {
                self.cascade(&handle).await;
                true
            }
            None => false,
        }
    }

    /// Removes an identity's connection only if it is still the given one.
    ///
    /// Used by the liveness sweep and ban eviction so a stale trigger
    /// cannot tear down a connection that already replaced the one it saw.
    pub async fn remove_exact(&self, identity: &UserId, conn_id: ConnectionId) -> bool {
        match self
            .connections
            .remove_if(identity, |_, handle| handle.id == conn_id)
        {
            Some((_, handle)) => {
                self.cascade(&handle).await;
                true
            }
            None => false,
        }
    }

    async fn cascade(&self, handle: &Arc<ConnectionHandle>) {
        handle.mark_closed();
        self.rooms.leave_all(handle.identity);

        if let Err(e) = self.store.delete(&keys::presence(handle.identity)).await {
            warn!(
                identity = %handle.identity,
                error = %e,
                "Presence delete failed, continuing"
            );
        }

        info!(
            identity = %handle.identity,
            conn_id = %handle.id,
            "Connection removed"
        );
    }

    /// Snapshot of all live handles (for sweeps and broadcast).
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Visits every live handle without materializing a snapshot.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<ConnectionHandle>)) {
        for entry in self.connections.iter() {
            f(entry.value());
        }
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Whether an identity currently holds a live connection.
    pub fn is_connected(&self, identity: &UserId) -> bool {
        self.connections.contains_key(identity)
    }

    /// All currently connected identities.
    pub fn connected_identities(&self) -> Vec<UserId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Disconnects every connection (graceful shutdown).
    pub async fn disconnect_all(&self) {
        let identities = self.connected_identities();
        for identity in &identities {
            self.remove(identity).await;
        }
        info!(count = identities.len(), "All connections disconnected");
    }
}

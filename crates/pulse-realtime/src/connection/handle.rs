//! Individual connection handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique connection identifier. A reconnecting identity gets a fresh one.
pub type ConnectionId = Uuid;

/// The stable subject a credential resolves to.
pub type UserId = Uuid;

/// A handle to a single live client session.
///
/// Holds the buffered sender the transport drains, plus activity metadata
/// for the liveness sweep. Owned by the registry; everything else refers to
/// it through identity lookups.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Identity that owns this connection.
    pub identity: UserId,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Sender for serialized outbound frames.
    sender: mpsc::Sender<String>,
    /// Last inbound activity, epoch milliseconds.
    last_activity_ms: AtomicI64,
    /// Whether the connection is still live.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new handle wrapping the given outbound sender.
    pub fn new(identity: UserId, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            identity,
            connected_at: now,
            sender,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a serialized frame to this connection's outbound buffer.
    ///
    /// Returns `false` on any delivery fault: the connection is closed, the
    /// buffer is full, or the transport went away.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    identity = %self.identity,
                    "Outbound buffer full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Whether the connection is still live.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection closed. Idempotent.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Refresh the last-activity timestamp. Called on every inbound frame.
    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Last inbound activity, epoch milliseconds.
    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Number of frames currently buffered toward the transport.
    pub fn pending_frames(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity_ms(&self, ms: i64) {
        self.last_activity_ms.store(ms, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        assert!(handle.send("hello".to_string()));

        handle.mark_closed();
        assert!(!handle.send("late".to_string()));
    }

    #[tokio::test]
    async fn test_send_full_buffer_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        assert!(handle.send("one".to_string()));
        assert!(!handle.send("two".to_string()));
        assert_eq!(handle.pending_frames(), 1);
    }

    #[tokio::test]
    async fn test_send_dropped_receiver_marks_closed() {
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        drop(rx);
        assert!(!handle.send("gone".to_string()));
        assert!(!handle.is_alive());
    }
}

//! Client protocol message definitions and well-known event names.

use serde::{Deserialize, Serialize};

/// Event name for fraud-score alerts.
pub const EVENT_FRAUD_ALERT: &str = "fraud-alert";
/// Event name for gamification achievement unlocks.
pub const EVENT_ACHIEVEMENT: &str = "achievement-unlocked";
/// Event name for learning-progress updates.
pub const EVENT_LEARNING_UPDATE: &str = "learning-update";
/// Event name for transaction status updates.
pub const EVENT_TRANSACTION_UPDATE: &str = "transaction-update";
/// Event name for quest progress updates.
pub const EVENT_QUEST_UPDATE: &str = "quest-update";
/// Event name for system-wide announcements.
pub const EVENT_ANNOUNCEMENT: &str = "system-announcement";

/// Messages sent by the client to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a batch of topics.
    Subscribe {
        /// Topic names to join.
        topics: Vec<String>,
    },
    /// Leave a batch of topics.
    Unsubscribe {
        /// Topic names to leave.
        topics: Vec<String>,
    },
    /// Client keepalive; any inbound frame refreshes liveness, this one
    /// exists for clients with nothing else to say.
    Ping,
}

/// Messages sent by the gateway to the client outside of event envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Request acknowledgment for subscribe/unsubscribe calls.
    Ack {
        /// Operation being acknowledged: `"subscribe"` or `"unsubscribe"`.
        op: String,
        /// Whether the request was applied.
        success: bool,
        /// Failure details when `success` is false.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    /// Keepalive response.
    Pong {
        /// Server timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Protocol-level error (e.g. an unparseable frame).
    Error {
        /// Stable reason code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

/// Error details attached to a failed acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable reason code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_roundtrip() {
        let raw = r#"{"type":"subscribe","topics":["transactions","fraud-alerts"]}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { ref topics } if topics.len() == 2));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = r#"{"type":"shout","topics":[]}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_ack_omits_error_on_success() {
        let ack = ServerMessage::Ack {
            op: "subscribe".to_string(),
            success: true,
            error: None,
        };
        let json = serde_json::to_string(&ack).unwrap();
        assert!(!json.contains("error"));
    }
}

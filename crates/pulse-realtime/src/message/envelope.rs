//! Delivery envelope wrapping every event pushed to a client.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an event reached this client.
///
/// System-scoped envelopes are broadcasts; clients use the scope to tell
/// them apart from personal notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    /// Sent to this identity specifically.
    Direct,
    /// Fanned out to a topic the client joined.
    Topic,
    /// Broadcast to every connected client.
    System,
}

/// The uniform wrapper around any delivered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    #[serde(rename = "type")]
    pub event: String,
    /// Event payload; producers may omit it entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    /// Delivery scope.
    pub scope: EventScope,
    /// Topic the event was fanned out on, for topic-scoped deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Envelope {
    fn new(event: &str, data: Option<Value>, scope: EventScope, topic: Option<String>) -> Self {
        Self {
            event: event.to_string(),
            data,
            timestamp: Utc::now().timestamp_millis(),
            scope,
            topic,
        }
    }

    /// Envelope for a targeted send to one identity.
    pub fn direct(event: &str, data: Option<Value>) -> Self {
        Self::new(event, data, EventScope::Direct, None)
    }

    /// Envelope for a topic fan-out.
    pub fn on_topic(topic: &str, event: &str, data: Option<Value>) -> Self {
        Self::new(event, data, EventScope::Topic, Some(topic.to_string()))
    }

    /// Envelope for a system-wide broadcast.
    pub fn system(event: &str, data: Option<Value>) -> Self {
        Self::new(event, data, EventScope::System, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_envelope_shape() {
        let env = Envelope::direct("fraud-alert", Some(serde_json::json!({"score": 0.9})));
        let value: Value = serde_json::to_value(&env).unwrap();

        assert_eq!(value["type"], "fraud-alert");
        assert_eq!(value["data"]["score"], 0.9);
        assert_eq!(value["scope"], "direct");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
        assert!(value.get("topic").is_none());
    }

    #[test]
    fn test_absent_payload_is_omitted() {
        let env = Envelope::direct("quest-update", None);
        let value: Value = serde_json::to_value(&env).unwrap();
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_system_envelope_is_distinguishable() {
        let direct = Envelope::direct("system-announcement", None);
        let system = Envelope::system("system-announcement", None);
        assert_ne!(direct.scope, system.scope);
        assert_eq!(system.scope, EventScope::System);
    }

    #[test]
    fn test_topic_envelope_carries_topic() {
        let env = Envelope::on_topic("fraud-alerts", "fraud-alert", None);
        let value: Value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["topic"], "fraud-alerts");
        assert_eq!(value["scope"], "topic");
    }
}

//! Bidirectional room membership index.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;

use crate::connection::handle::UserId;

/// Tracks topic membership in both directions.
///
/// The forward map (identity → topics) is the connection's subscription
/// set; the reverse map (topic → identities) serves fan-out. Both sides are
/// updated together on every mutation, and per-identity mutations are
/// serialized by the callers, so the two maps always agree.
#[derive(Debug, Default)]
pub struct RoomIndex {
    /// Identity → set of joined topic names.
    by_identity: DashMap<UserId, HashSet<String>>,
    /// Topic name → set of member identities.
    by_topic: DashMap<String, HashSet<UserId>>,
}

impl RoomIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a membership.
    pub fn add(&self, identity: UserId, topic: &str) {
        self.by_identity
            .entry(identity)
            .or_default()
            .insert(topic.to_string());
        self.by_topic
            .entry(topic.to_string())
            .or_default()
            .insert(identity);
    }

    /// Removes a membership. Removing one that never existed is a no-op.
    pub fn remove(&self, identity: UserId, topic: &str) {
        if let Some(mut topics) = self.by_identity.get_mut(&identity) {
            topics.remove(topic);
            if topics.is_empty() {
                drop(topics);
                self.by_identity.remove(&identity);
            }
        }
        self.remove_member(identity, topic);
    }

    /// Removes every membership of an identity, returning the topics left.
    pub fn remove_identity(&self, identity: UserId) -> HashSet<String> {
        let topics = self
            .by_identity
            .remove(&identity)
            .map(|(_, t)| t)
            .unwrap_or_default();
        for topic in &topics {
            self.remove_member(identity, topic);
        }
        topics
    }

    fn remove_member(&self, identity: UserId, topic: &str) {
        if let Some(mut members) = self.by_topic.get_mut(topic) {
            members.remove(&identity);
            if members.is_empty() {
                drop(members);
                self.by_topic.remove(topic);
            }
        }
    }

    /// Snapshot of a topic's member identities.
    pub fn members(&self, topic: &str) -> Vec<UserId> {
        self.by_topic
            .get(topic)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of an identity's joined topics.
    pub fn topics_of(&self, identity: UserId) -> HashSet<String> {
        self.by_identity
            .get(&identity)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Current member count of a topic.
    pub fn member_count(&self, topic: &str) -> usize {
        self.by_topic
            .get(topic)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Per-topic member counts for the stats surface.
    pub fn room_stats(&self) -> HashMap<String, usize> {
        self.by_topic
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }

    /// Number of topics with at least one member.
    pub fn topic_count(&self) -> usize {
        self.by_topic.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_add_updates_both_sides() {
        let index = RoomIndex::new();
        let id = Uuid::new_v4();
        index.add(id, "transactions");

        assert!(index.topics_of(id).contains("transactions"));
        assert_eq!(index.members("transactions"), vec![id]);
    }

    #[test]
    fn test_remove_identity_clears_memberships() {
        let index = RoomIndex::new();
        let id = Uuid::new_v4();
        index.add(id, "a");
        index.add(id, "b");

        let left = index.remove_identity(id);
        assert_eq!(left.len(), 2);
        assert_eq!(index.member_count("a"), 0);
        assert_eq!(index.member_count("b"), 0);
        assert!(index.topics_of(id).is_empty());
        assert_eq!(index.topic_count(), 0);
    }

    #[test]
    fn test_empty_topics_are_dropped() {
        let index = RoomIndex::new();
        let id = Uuid::new_v4();
        index.add(id, "quiet");
        index.remove(id, "quiet");
        assert_eq!(index.topic_count(), 0);
        assert!(index.room_stats().is_empty());
    }

    #[test]
    fn test_topics_are_case_sensitive() {
        let index = RoomIndex::new();
        let id = Uuid::new_v4();
        index.add(id, "Alerts");
        assert_eq!(index.member_count("alerts"), 0);
        assert_eq!(index.member_count("Alerts"), 1);
    }
}

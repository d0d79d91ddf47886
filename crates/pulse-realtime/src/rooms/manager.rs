//! Validated subscription API over the room index.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::connection::handle::UserId;
use crate::error::SubscribeError;

use super::index::RoomIndex;

/// Manages topic subscriptions for connected identities.
///
/// Topic names are opaque, case-sensitive strings; there is no hierarchy
/// or pattern matching.
#[derive(Debug)]
pub struct SubscriptionManager {
    /// Membership index.
    index: RoomIndex,
    /// Maximum topics accepted in one request.
    max_topics_per_request: usize,
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new(max_topics_per_request: usize) -> Self {
        Self {
            index: RoomIndex::new(),
            max_topics_per_request,
        }
    }

    /// Joins an identity to a batch of topics.
    pub fn join(&self, identity: UserId, topics: &[String]) -> Result<(), SubscribeError> {
        self.validate(topics)?;
        for topic in topics {
            self.index.add(identity, topic);
        }
        debug!(identity = %identity, count = topics.len(), "Joined topics");
        Ok(())
    }

    /// Removes an identity from a batch of topics.
    ///
    /// Leaving a topic the identity never joined is a no-op, not an error.
    pub fn leave(&self, identity: UserId, topics: &[String]) -> Result<(), SubscribeError> {
        self.validate(topics)?;
        for topic in topics {
            self.index.remove(identity, topic);
        }
        debug!(identity = %identity, count = topics.len(), "Left topics");
        Ok(())
    }

    /// Removes every membership of an identity (connection teardown).
    pub fn leave_all(&self, identity: UserId) -> HashSet<String> {
        self.index.remove_identity(identity)
    }

    /// Validation runs before any mutation so a rejected request leaves
    /// prior subscriptions untouched.
    fn validate(&self, topics: &[String]) -> Result<(), SubscribeError> {
        if topics.is_empty() {
            return Err(SubscribeError::InvalidFormat);
        }
        if topics.iter().any(|t| t.is_empty()) {
            return Err(SubscribeError::InvalidChannel);
        }
        if topics.len() > self.max_topics_per_request {
            return Err(SubscribeError::ChannelLimitExceeded);
        }
        Ok(())
    }

    /// Snapshot of a topic's member identities.
    pub fn members(&self, topic: &str) -> Vec<UserId> {
        self.index.members(topic)
    }

    /// Snapshot of an identity's joined topics.
    pub fn topics_of(&self, identity: UserId) -> HashSet<String> {
        self.index.topics_of(identity)
    }

    /// Current member count of a topic.
    pub fn member_count(&self, topic: &str) -> usize {
        self.index.member_count(topic)
    }

    /// Per-topic member counts for the stats surface.
    pub fn room_stats(&self) -> HashMap<String, usize> {
        self.index.room_stats()
    }
}

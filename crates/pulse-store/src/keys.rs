//! Store key builders for all Pulse entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the gateway uses.

use uuid::Uuid;

/// Store key for an identity's presence record.
pub fn presence(identity: Uuid) -> String {
    format!("presence:{identity}")
}

/// Store key for an identity's temporary ban flag.
pub fn ban(identity: Uuid) -> String {
    format!("ban:{identity}")
}

//! Abuse tracking: per-identity error counters and temporary bans.

pub mod tracker;

pub use tracker::{AbuseTracker, run_reset_cycle};

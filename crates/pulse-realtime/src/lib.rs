//! # pulse-realtime
//!
//! Real-time gateway engine for Pulse. Provides:
//!
//! - Connection registry with single-session-per-identity semantics
//! - Admission gate (credential check, ban check, presence bookkeeping)
//! - Topic rooms with batch subscribe/unsubscribe validation
//! - Abuse tracking with temporary bans
//! - Liveness sweep that evicts idle connections
//! - Event dispatch API for upstream producers (targeted, topic, broadcast)

pub mod abuse;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod message;
pub mod rooms;
pub mod server;
pub mod stats;

pub use abuse::tracker::AbuseTracker;
pub use connection::registry::ConnectionRegistry;
pub use dispatch::dispatcher::EventDispatcher;
pub use gate::AdmissionGate;
pub use rooms::manager::SubscriptionManager;
pub use server::GatewayEngine;

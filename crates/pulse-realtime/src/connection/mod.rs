//! Connection lifecycle: handles, the registry, and the liveness sweep.

pub mod handle;
pub mod liveness;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionId, UserId};
pub use liveness::LivenessMonitor;
pub use registry::ConnectionRegistry;

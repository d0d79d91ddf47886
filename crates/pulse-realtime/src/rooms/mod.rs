//! Topic rooms: membership index and the validated subscription API.

pub mod index;
pub mod manager;

pub use index::RoomIndex;
pub use manager::SubscriptionManager;

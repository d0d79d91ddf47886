//! Event dispatch: the producer-facing send/broadcast API.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;

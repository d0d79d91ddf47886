//! # pulse-core
//!
//! Core crate for the Pulse real-time gateway. Contains the presence-store
//! trait, configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Pulse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;

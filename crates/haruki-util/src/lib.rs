//! Shared utilities for harukid
//!
//! This crate provides:
//! - ID types (OwnerKey, SessionId, ClientId)
//! - Time utilities (monotonic instants on the tokio clock)
//! - Error types
//! - The notification dedup gate
//! - Text helpers for display labels
//! - Default paths for the config file and socket

mod dedup;
mod error;
mod ids;
mod paths;
mod text;
mod time;

pub use dedup::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use text::*;
pub use time::*;

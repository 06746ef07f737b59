//! Protocol types for harukid IPC
//!
//! This crate defines the stable API between harukid and chat bridges:
//! - Commands (invocations and component events from bridges)
//! - Responses carrying the next view to render
//! - Events (service -> bridges)
//! - Typed media records shared with the remote collaborators
//! - Inbound notification payloads
//! - Playback sessions from the activity monitor

mod activity;
mod commands;
mod components;
mod events;
mod media;
mod notification;
mod types;
mod view;

pub use activity::*;
pub use commands::*;
pub use components::*;
pub use events::*;
pub use media::*;
pub use notification::*;
pub use types::*;
pub use view::*;

/// Current API version
pub const API_VERSION: u32 = 1;

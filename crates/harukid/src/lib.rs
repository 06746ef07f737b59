//! harukid - media request and remediation service
//!
//! Wires the configured remote collaborators into the core dispatcher,
//! serves chat bridges over a Unix socket and relays catalog webhooks.

pub mod service;
pub mod sink;
pub mod webhook;

pub use service::{build_collaborators, handle_command, Service};

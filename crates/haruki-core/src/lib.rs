//! Wizard state machines and notification relay for harukid
//!
//! This crate contains:
//! - The request wizard (catalog search -> request or notify)
//! - The remediation wizard (missing media -> release -> approve)
//! - The request list and the catalog link wizard
//! - The activity view of what is playing right now
//! - One expiry watcher per session, posting the timeout notice
//! - Release ranking, paging and view rendering
//! - The notification relay for catalog webhooks
//! - A dispatcher mapping protocol commands onto all of the above

mod access;
mod activity;
mod dispatch;
mod link;
mod notify;
mod paging;
mod ranking;
mod remediation;
pub mod render;
mod request;
mod request_list;
mod watcher;

pub use access::{is_privileged, may_act_for, role_denied};
pub use activity::*;
pub use dispatch::*;
pub use link::*;
pub use notify::*;
pub use paging::{page_count, Page};
pub use ranking::*;
pub use remediation::*;
pub use request::*;
pub use request_list::*;
pub use watcher::*;

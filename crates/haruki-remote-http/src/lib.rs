//! HTTP collaborators for harukid
//!
//! - [`JellyseerrClient`]: catalog search, detail, requests and identity linking
//! - [`ArrClient`]: Sonarr/Radarr listings, releases and approvals
//! - [`TautulliClient`]: what the media server is playing right now
//!
//! Every call carries the service's `X-Api-Key`; Tautulli also takes it as
//! the `apikey` query parameter. Non-2xx answers become
//! [`haruki_remote_api::RemoteError::Http`] with the body cut to 300 characters.

mod activity;
mod arr;
mod catalog;
mod client;

pub use activity::*;
pub use arr::*;
pub use catalog::*;
pub use client::*;

//! Event types for harukid -> bridge streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{View, ViewRef, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: haruki_util::now(),
            payload,
        }
    }
}

/// Effects the service pushes on its own, outside any request/response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Edit an existing message (placeholders, expiry notices)
    ViewEdited { target: ViewRef, view: View },

    /// Post a new message to a channel (relayed notifications)
    ViewPosted {
        channel_id: String,
        /// Plain-text part, used for mentions
        #[serde(default)]
        content: String,
        view: View,
    },

    /// Service is shutting down
    Shutdown,
}

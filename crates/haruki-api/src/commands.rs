//! Command types for the harukid protocol

use haruki_util::ClientId;
use serde::{Deserialize, Serialize};

use crate::{Caller, HealthStatus, Reply, ViewRef, API_VERSION};

/// One NDJSON line from a bridge. `request_id` is echoed in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// 0 when the request line could not be parsed
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    fn with_result(request_id: u64, result: ResponseResult) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result,
        }
    }

    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self::with_result(request_id, ResponseResult::Ok(payload))
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self::with_result(request_id, ResponseResult::Err(error))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.result, ResponseResult::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Protocol-level failure; wizard outcomes are always a [`Reply`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnknownComponent,
    InvalidValue,
    NotConfigured,
    UnsupportedVersion,
    InternalError,
}

/// Slash-command style invocation that starts a wizard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "wizard", rename_all = "snake_case")]
pub enum Invocation {
    /// Search the catalog and request an item
    Request { media_type: String, query: String },
    /// Find a title with missing files and grab a release for it
    Remediation {
        media_type: String,
        query: String,
        #[serde(default)]
        listing_mode: Option<String>,
    },
    /// Page through a catalog user's requests; `user` defaults to the caller
    RequestList {
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        include_finished: bool,
    },
    /// Link a chat identity to a catalog user; `user` defaults to the caller
    Link {
        #[serde(default)]
        user: Option<String>,
    },
    /// What the media server is playing right now
    Activity,
}

/// All possible commands from bridges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start a wizard. `target` is the placeholder message the bridge
    /// already posted in acknowledgment.
    Invoke {
        caller: Caller,
        target: ViewRef,
        invocation: Invocation,
    },

    /// A control on a wizard message was used
    Component {
        caller: Caller,
        target: ViewRef,
        component_id: String,
        #[serde(default)]
        values: Vec<String>,
    },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Reply(Reply),
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Card, View};

    #[test]
    fn invoke_deserializes_from_bridge_json() {
        let json = r#"{
            "request_id": 7,
            "api_version": 1,
            "command": {
                "type": "invoke",
                "caller": {"owner": "1001", "display_name": "ann", "roles": ["plex"]},
                "target": {"channel_id": "c1", "message_id": "m1"},
                "invocation": {"wizard": "remediation", "media_type": "tv", "query": "lost"}
            }
        }"#;

        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.request_id, 7);
        match req.command {
            Command::Invoke { caller, invocation: Invocation::Remediation { listing_mode, .. }, .. } => {
                assert!(!caller.privileged);
                assert!(listing_mode.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn list_link_and_activity_invocations() {
        let parse = |raw: &str| serde_json::from_str::<Invocation>(raw).unwrap();

        match parse(r#"{"wizard": "request_list"}"#) {
            Invocation::RequestList { user, include_finished } => {
                assert_eq!(user, None);
                assert!(!include_finished);
            }
            other => panic!("unexpected invocation: {:?}", other),
        }
        assert!(matches!(
            parse(r#"{"wizard": "link", "user": "2002"}"#),
            Invocation::Link { user: Some(ref u) } if u == "2002"
        ));
        assert!(matches!(parse(r#"{"wizard": "activity"}"#), Invocation::Activity));
    }

    #[test]
    fn reply_response_round_trips() {
        let resp = Response::success(
            3,
            ResponsePayload::Reply(Reply::render(View::terminal(Card::new("Aborted", "")))),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 3);
        match parsed.result {
            ResponseResult::Ok(ResponsePayload::Reply(Reply::Render { view })) => {
                assert!(view.clears_controls());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

//! Inbound notification payloads pushed by the catalog service

use serde::{Deserialize, Serialize};

/// Webhook body as sent by the catalog service's notification agent.
///
/// Every field is optional on the wire; the agent template decides which
/// ones are filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub notification_type: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extra: Vec<ExtraInfo>,
    #[serde(default, rename = "discord_channel_id", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub media_type: String,
    #[serde(default, rename = "tmdbId")]
    pub tmdb_id: String,
    #[serde(default, rename = "tvdbId")]
    pub tvdb_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "status4k")]
    pub status_4k: String,
}

impl MediaInfo {
    /// TMDB id, falling back to the TVDB id
    pub fn media_id(&self) -> &str {
        let tmdb = self.tmdb_id.trim();
        if tmdb.is_empty() {
            self.tvdb_id.trim()
        } else {
            tmdb
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(default)]
    pub request_id: String,
    #[serde(default, rename = "requestedBy_email")]
    pub email: String,
    #[serde(default, rename = "requestedBy_username")]
    pub username: String,
    #[serde(default, rename = "requestedBy_avatar")]
    pub avatar: String,
    #[serde(default, rename = "requestedBy_id")]
    pub user_id: String,
    #[serde(default, rename = "requestedBy_requestCount")]
    pub request_count: String,
    #[serde(default, rename = "requestedBy_settings_discordId")]
    pub discord_id: String,
    #[serde(default, rename = "requestedBy_settings_telegramChatId")]
    pub telegram_chat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueInfo {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub issue_status: String,
    #[serde(default, rename = "reportedBy_email")]
    pub email: String,
    #[serde(default, rename = "reportedBy_username")]
    pub username: String,
    #[serde(default, rename = "reportedBy_avatar")]
    pub avatar: String,
    #[serde(default, rename = "reportedBy_id")]
    pub user_id: String,
    #[serde(default, rename = "reportedBy_requestCount")]
    pub request_count: String,
    #[serde(default, rename = "reportedBy_settings_discordId")]
    pub discord_id: String,
    #[serde(default, rename = "reportedBy_settings_telegramChatId")]
    pub telegram_chat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentInfo {
    #[serde(default)]
    pub comment_message: String,
    #[serde(default, rename = "commentedBy_email")]
    pub email: String,
    #[serde(default, rename = "commentedBy_username")]
    pub username: String,
    #[serde(default, rename = "commentedBy_avatar")]
    pub avatar: String,
    #[serde(default, rename = "commentedBy_id")]
    pub user_id: String,
    #[serde(default, rename = "commentedBy_requestCount")]
    pub request_count: String,
    #[serde(default, rename = "commentedBy_settings_discordId")]
    pub discord_id: String,
    #[serde(default, rename = "commentedBy_settings_telegramChatId")]
    pub telegram_chat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// The person a notification is about, whichever block carried them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub user_id: &'a str,
    pub request_count: &'a str,
    pub discord_id: &'a str,
}

impl NotificationPayload {
    /// Key used by the dedup gate: `EVENT|MEDIATYPE|MEDIAID|SUBJECT`
    pub fn dedup_key(&self) -> String {
        let event = self.event.trim().to_uppercase();
        let subject = self.subject.trim().to_uppercase();
        let (media_type, media_id) = match &self.media {
            Some(media) => (
                media.media_type.trim().to_uppercase(),
                media.media_id().to_string(),
            ),
            None => (String::new(), String::new()),
        };
        format!("{}|{}|{}|{}", event, media_type, media_id, subject)
    }

    /// Requester, reporter or commenter, in that priority
    pub fn actor(&self) -> Option<Actor<'_>> {
        if let Some(r) = &self.request {
            return Some(Actor {
                username: &r.username,
                email: &r.email,
                user_id: &r.user_id,
                request_count: &r.request_count,
                discord_id: &r.discord_id,
            });
        }
        if let Some(i) = &self.issue {
            return Some(Actor {
                username: &i.username,
                email: &i.email,
                user_id: &i.user_id,
                request_count: &i.request_count,
                discord_id: &i.discord_id,
            });
        }
        self.comment.as_ref().map(|c| Actor {
            username: &c.username,
            email: &c.email,
            user_id: &c.user_id,
            request_count: &c.request_count,
            discord_id: &c.discord_id,
        })
    }

    /// Look up an `extra` entry by any of the given names (case-insensitive)
    pub fn extra_value(&self, names: &[&str]) -> Option<&str> {
        self.extra.iter().find_map(|ex| {
            let name = ex.name.trim();
            names
                .iter()
                .any(|n| n.trim().eq_ignore_ascii_case(name))
                .then_some(ex.value.as_str())
        })
    }

    /// Linked chat ids mentioned anywhere in the payload
    pub fn mentioned_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let candidates = [
            self.request.as_ref().map(|r| r.discord_id.as_str()),
            self.issue.as_ref().map(|i| i.discord_id.as_str()),
            self.comment.as_ref().map(|c| c.discord_id.as_str()),
        ];
        for id in candidates.into_iter().flatten() {
            let id = id.trim();
            if !id.is_empty() && !ids.iter().any(|known: &String| known == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ExtraInfo>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Vec<ExtraInfo>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

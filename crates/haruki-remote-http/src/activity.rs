//! Tautulli activity client

use async_trait::async_trait;
use haruki_api::{PlaybackKind, PlaybackSession};
use haruki_remote_api::{ActivityClient, RemoteError, RemoteResult};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

use crate::client::{encode_query, JsonClient};

/// Width requested from the image proxy
const THUMB_WIDTH: u32 = 300;

pub struct TautulliClient {
    client: JsonClient,
}

impl TautulliClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self {
            client: JsonClient::new(base_url, api_key, timeout)?,
        })
    }

    /// `cmd` call path; `/api/v2` is appended unless the base already points at the API
    fn command_path(&self, cmd: &str) -> String {
        let root = if self.client.base_url().contains("/api/") {
            ""
        } else {
            "/api/v2"
        };
        format!(
            "{}?apikey={}&cmd={}",
            root,
            encode_query(self.client.api_key()),
            cmd
        )
    }

    /// Absolute image proxy URL for a library image path
    pub fn image_url(&self, img: &str) -> Option<String> {
        let img = img.trim();
        if img.is_empty() {
            return None;
        }
        let path = format!(
            "{}&img={}&width={}",
            self.command_path("pms_image_proxy"),
            encode_query(img),
            THUMB_WIDTH
        );
        Some(self.client.url(&path))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: ActivityResponse,
}

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    data: ActivityData,
}

#[derive(Debug, Default, Deserialize)]
struct ActivityData {
    #[serde(default)]
    sessions: Vec<WireSession>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireSession {
    media_type: String,
    state: String,
    user: String,
    player: String,
    product: String,
    platform: String,
    library_name: String,
    title: String,
    parent_title: String,
    grandparent_title: String,
    full_title: String,
    quality_profile: String,
    #[serde(deserialize_with = "lenient_number")]
    stream_bitrate: Option<u64>,
    stream_video_full_resolution: String,
    video_full_resolution: String,
    thumb: String,
    parent_thumb: String,
    grandparent_thumb: String,
}

/// Tautulli sends numbers as strings, sometimes empty
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl WireSession {
    /// Cover art for music, show poster for episodes, else the item itself
    fn best_thumb(&self) -> &str {
        let order: [&str; 3] = match PlaybackKind::parse(&self.media_type) {
            PlaybackKind::Music => [
                self.grandparent_thumb.as_str(),
                self.parent_thumb.as_str(),
                self.thumb.as_str(),
            ],
            PlaybackKind::Episode => [self.grandparent_thumb.as_str(), self.thumb.as_str(), ""],
            PlaybackKind::Movie | PlaybackKind::Other => [
                self.thumb.as_str(),
                self.grandparent_thumb.as_str(),
                self.parent_thumb.as_str(),
            ],
        };
        order.into_iter().find(|t| !t.trim().is_empty()).unwrap_or("")
    }

    fn into_session(self, thumbnail: Option<String>) -> PlaybackSession {
        let video_resolution = if self.stream_video_full_resolution.trim().is_empty() {
            self.video_full_resolution
        } else {
            self.stream_video_full_resolution
        };
        PlaybackSession {
            media_type: self.media_type,
            state: self.state,
            user: self.user,
            player: self.player,
            product: self.product,
            platform: self.platform,
            library_name: self.library_name,
            title: self.title,
            parent_title: self.parent_title,
            grandparent_title: self.grandparent_title,
            full_title: self.full_title,
            quality_profile: self.quality_profile,
            stream_bitrate: self.stream_bitrate,
            video_resolution,
            thumbnail,
        }
    }
}

#[async_trait]
impl ActivityClient for TautulliClient {
    async fn current_activity(&self) -> RemoteResult<Vec<PlaybackSession>> {
        let envelope: Envelope = self.client.get(&self.command_path("get_activity")).await?;
        let response = envelope.response;
        if response.result != "success" {
            let message = response.message.map(|m| m.to_string()).unwrap_or_default();
            return Err(RemoteError::Decode(format!(
                "get_activity failed: result={} message={}",
                response.result, message
            )));
        }

        let sessions: Vec<PlaybackSession> = response
            .data
            .sessions
            .into_iter()
            .map(|wire| {
                let thumbnail = self.image_url(wire.best_thumb());
                wire.into_session(thumbnail)
            })
            .collect();
        debug!(sessions = sessions.len(), "Fetched activity");
        Ok(sessions)
    }
}

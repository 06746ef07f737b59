//! Playback sessions reported by the activity monitor

use serde::{Deserialize, Serialize};

/// What is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackKind {
    Music,
    Episode,
    Movie,
    Other,
}

impl PlaybackKind {
    pub fn parse(media_type: &str) -> Self {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "track" => Self::Music,
            "episode" => Self::Episode,
            "movie" => Self::Movie,
            _ => Self::Other,
        }
    }
}

/// One stream currently playing on the media server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub media_type: String,
    /// `playing`, `paused`, `buffering`
    pub state: String,
    pub user: String,
    pub player: String,
    pub product: String,
    pub platform: String,
    pub library_name: String,
    pub title: String,
    /// Season or album
    pub parent_title: String,
    /// Show or artist
    pub grandparent_title: String,
    pub full_title: String,
    pub quality_profile: String,
    /// Stream bitrate in kbps
    pub stream_bitrate: Option<u64>,
    pub video_resolution: String,
    /// Poster or cover, already an absolute URL
    pub thumbnail: Option<String>,
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl PlaybackSession {
    pub fn kind(&self) -> PlaybackKind {
        PlaybackKind::parse(&self.media_type)
    }

    /// `Original`, else `8 Mbps 1080p` style, else the raw profile
    pub fn quality_label(&self) -> String {
        if self.quality_profile.trim().eq_ignore_ascii_case("original") {
            return "Original".to_string();
        }

        let mut parts = Vec::new();
        if let Some(kbps) = self.stream_bitrate.filter(|k| *k > 0) {
            if kbps % 1000 == 0 {
                parts.push(format!("{} Mbps", kbps / 1000));
            } else {
                parts.push(format!("{:.1} Mbps", kbps as f64 / 1000.0));
            }
        }
        if let Some(resolution) = non_blank(&self.video_resolution) {
            parts.push(resolution.to_string());
        }

        if parts.is_empty() {
            non_blank(&self.quality_profile).unwrap_or("—").to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Card title and subtitle: song over artist and album, show over
    /// season and episode, movie over library
    pub fn headline(&self) -> (String, String) {
        let joined = |parts: &[&str]| {
            parts
                .iter()
                .filter_map(|p| non_blank(p))
                .collect::<Vec<_>>()
                .join(" • ")
        };
        match self.kind() {
            PlaybackKind::Music => (
                non_blank(&self.title).unwrap_or("Now Playing").to_string(),
                joined(&[&self.grandparent_title, &self.parent_title]),
            ),
            PlaybackKind::Episode => (
                non_blank(&self.grandparent_title).unwrap_or("Now Watching").to_string(),
                joined(&[&self.parent_title, &self.title]),
            ),
            PlaybackKind::Movie | PlaybackKind::Other => {
                let title = non_blank(&self.title)
                    .or_else(|| non_blank(&self.full_title))
                    .unwrap_or("Now Watching");
                let subtitle = non_blank(&self.library_name)
                    .map(str::to_string)
                    .unwrap_or_else(|| capitalize(self.media_type.trim()));
                (title.to_string(), subtitle)
            }
        }
    }

    /// `player • product • State`
    pub fn device_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(player) = non_blank(&self.player) {
            parts.push(player.to_string());
        }
        if let Some(product) = non_blank(&self.product).or_else(|| non_blank(&self.platform)) {
            parts.push(product.to_string());
        }
        if let Some(state) = non_blank(&self.state) {
            parts.push(capitalize(state));
        }
        parts.join(" • ")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_prefers_original_then_bitrate() {
        let mut session = PlaybackSession {
            quality_profile: "original".into(),
            stream_bitrate: Some(8000),
            video_resolution: "1080p".into(),
            ..Default::default()
        };
        assert_eq!(session.quality_label(), "Original");

        session.quality_profile = "8 Mbps 1080p".into();
        assert_eq!(session.quality_label(), "8 Mbps 1080p");
        session.stream_bitrate = Some(4500);
        assert_eq!(session.quality_label(), "4.5 Mbps 1080p");

        session.stream_bitrate = None;
        session.video_resolution.clear();
        assert_eq!(session.quality_label(), "8 Mbps 1080p");
        session.quality_profile.clear();
        assert_eq!(session.quality_label(), "—");
    }

    #[test]
    fn headline_by_kind() {
        let episode = PlaybackSession {
            media_type: "episode".into(),
            title: "Pilot".into(),
            parent_title: "Season 1".into(),
            grandparent_title: "Lost".into(),
            ..Default::default()
        };
        assert_eq!(episode.headline(), ("Lost".into(), "Season 1 • Pilot".into()));

        let movie = PlaybackSession {
            media_type: "movie".into(),
            full_title: "Heat".into(),
            ..Default::default()
        };
        assert_eq!(movie.headline(), ("Heat".into(), "Movie".into()));
    }

    #[test]
    fn device_line_falls_back_to_platform() {
        let session = PlaybackSession {
            player: "Living Room".into(),
            platform: "Roku".into(),
            state: "PAUSED".into(),
            ..Default::default()
        };
        assert_eq!(session.device_line(), "Living Room • Roku • Paused");
    }
}

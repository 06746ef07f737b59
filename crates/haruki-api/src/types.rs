//! Shared types for the harukid API

use haruki_util::OwnerKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media a wizard works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// Parse user input (`tv` / `movie`, case and whitespace insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }

    /// Path segment / wire value used by the catalog service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Tv => "TV",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which titles the remediation wizard lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListingMode {
    /// Only titles/episodes without a file
    #[default]
    #[serde(rename = "missing only")]
    MissingOnly,
    /// Everything, files or not
    #[serde(rename = "all files")]
    AllFiles,
}

impl ListingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "missing only" => Some(Self::MissingOnly),
            "all files" => Some(Self::AllFiles),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingOnly => "missing only",
            Self::AllFiles => "all files",
        }
    }
}

/// Who triggered an interaction, as reported by the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub owner: OwnerKey,
    #[serde(default)]
    pub display_name: String,
    /// Role ids the caller holds on the chat side
    #[serde(default)]
    pub roles: Vec<String>,
    /// Bridge-asserted admin flag
    #[serde(default)]
    pub privileged: bool,
}

impl Caller {
    pub fn new(owner: impl Into<OwnerKey>, display_name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            display_name: display_name.into(),
            roles: Vec::new(),
            privileged: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Name used in rendered cards
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.owner.as_str()
        } else {
            &self.display_name
        }
    }
}

/// Reference to a rendered message on the chat side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewRef {
    pub channel_id: String,
    pub message_id: String,
}

impl ViewRef {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

impl fmt::Display for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub catalog_configured: bool,
    pub series_configured: bool,
    pub movies_configured: bool,
    pub webhook_enabled: bool,
    pub request_sessions: usize,
    pub remediation_sessions: usize,
    #[serde(default)]
    pub activity_configured: bool,
    #[serde(default)]
    pub request_list_sessions: usize,
    #[serde(default)]
    pub link_sessions: usize,
}

//! Component identifiers attached to interactive controls

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which control produced a component event.
///
/// The wire form is a dotted string (`request.select`), which is what a
/// bridge stores as the control's custom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    #[serde(rename = "request.select")]
    RequestSelect,
    #[serde(rename = "request.confirm")]
    RequestConfirm,
    #[serde(rename = "request.notify")]
    RequestNotify,
    #[serde(rename = "request.abort")]
    RequestAbort,
    #[serde(rename = "remedy.media")]
    RemedySelectMedia,
    #[serde(rename = "remedy.media.next")]
    RemedyMediaNext,
    #[serde(rename = "remedy.media.prev")]
    RemedyMediaPrev,
    #[serde(rename = "remedy.season")]
    RemedySelectSeason,
    #[serde(rename = "remedy.episode")]
    RemedySelectEpisode,
    #[serde(rename = "remedy.episode.next")]
    RemedyEpisodeNext,
    #[serde(rename = "remedy.episode.prev")]
    RemedyEpisodePrev,
    #[serde(rename = "remedy.release")]
    RemedySelectRelease,
    #[serde(rename = "remedy.release.next")]
    RemedyReleaseNext,
    #[serde(rename = "remedy.release.prev")]
    RemedyReleasePrev,
    #[serde(rename = "remedy.release.change")]
    RemedyChangeRelease,
    #[serde(rename = "remedy.approve")]
    RemedyApprove,
    #[serde(rename = "remedy.abort")]
    RemedyAbort,
    #[serde(rename = "requests.next")]
    RequestListNext,
    #[serde(rename = "requests.prev")]
    RequestListPrev,
    #[serde(rename = "requests.abort")]
    RequestListAbort,
    #[serde(rename = "link.select")]
    LinkSelect,
    #[serde(rename = "link.next")]
    LinkNext,
    #[serde(rename = "link.prev")]
    LinkPrev,
    #[serde(rename = "link.abort")]
    LinkAbort,
}

impl ComponentId {
    pub const ALL: [ComponentId; 24] = [
        Self::RequestSelect,
        Self::RequestConfirm,
        Self::RequestNotify,
        Self::RequestAbort,
        Self::RemedySelectMedia,
        Self::RemedyMediaNext,
        Self::RemedyMediaPrev,
        Self::RemedySelectSeason,
        Self::RemedySelectEpisode,
        Self::RemedyEpisodeNext,
        Self::RemedyEpisodePrev,
        Self::RemedySelectRelease,
        Self::RemedyReleaseNext,
        Self::RemedyReleasePrev,
        Self::RemedyChangeRelease,
        Self::RemedyApprove,
        Self::RemedyAbort,
        Self::RequestListNext,
        Self::RequestListPrev,
        Self::RequestListAbort,
        Self::LinkSelect,
        Self::LinkNext,
        Self::LinkPrev,
        Self::LinkAbort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSelect => "request.select",
            Self::RequestConfirm => "request.confirm",
            Self::RequestNotify => "request.notify",
            Self::RequestAbort => "request.abort",
            Self::RemedySelectMedia => "remedy.media",
            Self::RemedyMediaNext => "remedy.media.next",
            Self::RemedyMediaPrev => "remedy.media.prev",
            Self::RemedySelectSeason => "remedy.season",
            Self::RemedySelectEpisode => "remedy.episode",
            Self::RemedyEpisodeNext => "remedy.episode.next",
            Self::RemedyEpisodePrev => "remedy.episode.prev",
            Self::RemedySelectRelease => "remedy.release",
            Self::RemedyReleaseNext => "remedy.release.next",
            Self::RemedyReleasePrev => "remedy.release.prev",
            Self::RemedyChangeRelease => "remedy.release.change",
            Self::RemedyApprove => "remedy.approve",
            Self::RemedyAbort => "remedy.abort",
            Self::RequestListNext => "requests.next",
            Self::RequestListPrev => "requests.prev",
            Self::RequestListAbort => "requests.abort",
            Self::LinkSelect => "link.select",
            Self::LinkNext => "link.next",
            Self::LinkPrev => "link.prev",
            Self::LinkAbort => "link.abort",
        }
    }

    /// Whether the control belongs to the request wizard
    pub fn is_request(&self) -> bool {
        self.as_str().starts_with("request.")
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

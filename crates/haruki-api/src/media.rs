//! Typed media records exchanged with the remote collaborators
//!
//! Remote services answer with loosely shaped JSON. Clients convert it into
//! these records at the boundary so the wizards never poke at raw maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MediaKind;

/// User id inside the catalog service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<String>,
}

impl Candidate {
    /// `Title (Year)`, or just the title when the year is unknown
    pub fn label(&self) -> String {
        match &self.year {
            Some(year) if !year.is_empty() => format!("{} ({})", self.title, year),
            _ => self.title.clone(),
        }
    }
}

/// Availability of a media item in the catalog service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    /// The catalog has no record yet
    NotTracked,
    Unknown,
    Pending,
    Processing,
    PartiallyAvailable,
    Available,
    Deleted,
}

impl MediaStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Unknown,
            2 => Self::Pending,
            3 => Self::Processing,
            4 => Self::PartiallyAvailable,
            5 => Self::Available,
            6 => Self::Deleted,
            _ => Self::NotTracked,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::NotTracked => 0,
            Self::Unknown => 1,
            Self::Pending => 2,
            Self::Processing => 3,
            Self::PartiallyAvailable => 4,
            Self::Available => 5,
            Self::Deleted => 6,
        }
    }

    /// Somebody already asked for it and it is on its way
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// A user who requested a media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub id: UserId,
    pub display_name: String,
}

impl Requester {
    pub fn name(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("User {}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}

/// Full detail for one media item, including live availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetail {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<String>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub status: MediaStatus,
    /// In request order; the first entry is the original requester
    pub requesters: Vec<Requester>,
}

impl MediaDetail {
    pub fn has_requester(&self, user: UserId) -> bool {
        self.requesters.iter().any(|r| r.id == user)
    }

    /// The original requester plus everyone else who will be notified
    pub fn requester_summary(&self) -> Option<(String, Vec<String>)> {
        let (first, rest) = self.requesters.split_first()?;
        Some((first.name(), rest.iter().map(Requester::name).collect()))
    }

    pub fn label(&self) -> String {
        match &self.year {
            Some(year) if !year.is_empty() => format!("{} ({})", self.title, year),
            _ => self.title.clone(),
        }
    }
}

/// What the catalog tells us after a request was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReceipt {
    /// Requests by this user before the one just created
    pub request_count: u32,
}

/// Catalog user profile, as far as notifications and linking need it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUser {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    /// Linked chat identity, if the user set one
    pub external_id: Option<String>,
}

impl CatalogUser {
    /// Display name, else email, else `User {id}`
    pub fn label(&self) -> String {
        if !self.display_name.trim().is_empty() {
            self.display_name.clone()
        } else if !self.email.trim().is_empty() {
            self.email.clone()
        } else {
            format!("User {}", self.id)
        }
    }

    pub fn is_linked(&self) -> bool {
        self.external_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

/// One request a catalog user made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    pub id: u64,
    pub kind: Option<MediaKind>,
    pub title: String,
    pub year: Option<String>,
    /// Availability of the requested media, not the request's own state
    pub media_status: MediaStatus,
    #[serde(default)]
    pub is_4k: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRequest {
    /// The media is fully available
    pub fn is_finished(&self) -> bool {
        self.media_status == MediaStatus::Available
    }

    /// `Title (Year)` unless the title already carries the year
    pub fn label(&self) -> String {
        let title = self.title.trim();
        let title = if title.is_empty() { "Unknown Title" } else { title };
        match &self.year {
            Some(year) if !year.is_empty() && !title.contains(&format!("({})", year)) => {
                format!("{} ({})", title, year)
            }
            _ => title.to_string(),
        }
    }
}

/// A movie or series known to an acquisition service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: u64,
    pub title: String,
    pub year: Option<u32>,
}

/// One episode of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u64,
    pub series_id: u64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    pub has_file: bool,
}

impl Episode {
    /// `SxxEyy - title`
    pub fn code(&self) -> String {
        format!(
            "S{:02}E{:02} - {}",
            self.season_number, self.episode_number, self.title
        )
    }
}

/// What a release lookup is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ReleaseScope {
    Episode(u64),
    Movie(u64),
}

/// One downloadable release offered by an indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub guid: String,
    pub title: String,
    #[serde(default)]
    pub movie_titles: Vec<String>,
    pub indexer_id: i64,
    #[serde(default)]
    pub indexer: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub rejections: Vec<String>,
    pub custom_format_score: Option<f64>,
    pub quality_weight: Option<f64>,
    /// Size in bytes
    pub size: Option<u64>,
    pub quality: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Release {
    /// Release title, falling back to the first movie title
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            return &self.title;
        }
        self.movie_titles.first().map(String::as_str).unwrap_or("")
    }

    /// Preference score used for ranking
    pub fn score(&self) -> f64 {
        self.custom_format_score
            .or(self.quality_weight)
            .unwrap_or(0.0)
    }

    /// Worth offering: not rejected, or rejected but still scored positively
    pub fn is_usable(&self) -> bool {
        !self.rejected || self.custom_format_score.unwrap_or(0.0) > 0.0
    }

    pub fn size_gb(&self) -> Option<f64> {
        self.size.map(|bytes| bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(guid: &str) -> Release {
        Release {
            guid: guid.into(),
            title: String::new(),
            movie_titles: vec![],
            indexer_id: 1,
            indexer: "nzb".into(),
            protocol: "usenet".into(),
            approved: true,
            rejected: false,
            rejections: vec![],
            custom_format_score: None,
            quality_weight: None,
            size: None,
            quality: None,
            languages: vec![],
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(MediaStatus::from_code(5), MediaStatus::Available);
        assert_eq!(MediaStatus::from_code(0), MediaStatus::NotTracked);
        assert!(MediaStatus::from_code(2).is_requested());
        assert!(MediaStatus::from_code(3).is_requested());
        assert!(!MediaStatus::from_code(4).is_requested());
    }

    #[test]
    fn requester_summary_splits_first_from_watchers() {
        let detail = MediaDetail {
            id: 1,
            kind: MediaKind::Movie,
            title: "Foo".into(),
            year: Some("2001".into()),
            overview: String::new(),
            poster_path: None,
            status: MediaStatus::Pending,
            requesters: vec![
                Requester { id: UserId(3), display_name: "ann".into() },
                Requester { id: UserId(9), display_name: String::new() },
            ],
        };

        let (first, watchers) = detail.requester_summary().unwrap();
        assert_eq!(first, "ann");
        assert_eq!(watchers, vec!["User 9".to_string()]);
        assert!(detail.has_requester(UserId(9)));
        assert!(!detail.has_requester(UserId(4)));
    }

    #[test]
    fn release_score_fallbacks() {
        let mut r = release("a");
        assert_eq!(r.score(), 0.0);
        r.quality_weight = Some(12.0);
        assert_eq!(r.score(), 12.0);
        r.custom_format_score = Some(-5.0);
        assert_eq!(r.score(), -5.0);
    }

    #[test]
    fn release_title_falls_back_to_movie_titles() {
        let mut r = release("a");
        r.movie_titles = vec!["Heat".into()];
        assert_eq!(r.display_title(), "Heat");
        r.title = "Heat.1995.1080p".into();
        assert_eq!(r.display_title(), "Heat.1995.1080p");
    }

    #[test]
    fn rejected_release_with_positive_score_is_usable() {
        let mut r = release("a");
        r.rejected = true;
        assert!(!r.is_usable());
        r.custom_format_score = Some(10.0);
        assert!(r.is_usable());
    }

    #[test]
    fn catalog_user_label_fallbacks() {
        let mut user = CatalogUser {
            id: UserId(4),
            display_name: String::new(),
            email: "ann@example.com".into(),
            external_id: Some(" ".into()),
        };
        assert_eq!(user.label(), "ann@example.com");
        assert!(!user.is_linked());
        user.email.clear();
        assert_eq!(user.label(), "User 4");
    }

    #[test]
    fn request_label_does_not_repeat_the_year() {
        let mut request = UserRequest {
            id: 1,
            kind: Some(MediaKind::Movie),
            title: "Heat (1995)".into(),
            year: Some("1995".into()),
            media_status: MediaStatus::Available,
            is_4k: false,
            created_at: None,
        };
        assert_eq!(request.label(), "Heat (1995)");
        assert!(request.is_finished());
        request.title = "Heat".into();
        assert_eq!(request.label(), "Heat (1995)");
        request.title.clear();
        request.year = None;
        assert_eq!(request.label(), "Unknown Title");
    }

    #[test]
    fn episode_code() {
        let ep = Episode {
            id: 11,
            series_id: 1,
            season_number: 2,
            episode_number: 7,
            title: "Pilot".into(),
            has_file: false,
        };
        assert_eq!(ep.code(), "S02E07 - Pilot");
    }
}

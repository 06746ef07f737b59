//! Sonarr/Radarr (v3 API) acquisition client

use async_trait::async_trait;
use haruki_api::{Episode, MediaKind, Release, ReleaseScope, Title};
use haruki_remote_api::{AcquisitionClient, RemoteError, RemoteResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::JsonClient;

/// Records per `wanted/missing` page
const MISSING_PAGE_SIZE: u32 = 1000;

/// Series (Sonarr) or movie (Radarr) service
pub struct ArrClient {
    kind: MediaKind,
    client: JsonClient,
}

impl ArrClient {
    pub fn series(base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        Self::new(MediaKind::Tv, base_url, api_key, timeout)
    }

    pub fn movies(base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        Self::new(MediaKind::Movie, base_url, api_key, timeout)
    }

    fn new(kind: MediaKind, base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self {
            kind,
            client: JsonClient::new(base_url, api_key, timeout)?,
        })
    }

    /// Every `wanted/missing` record, page by page until `totalRecords`
    async fn missing_records<T: DeserializeOwned>(&self, extra_query: &str) -> RemoteResult<Vec<T>> {
        let mut records = Vec::new();
        for page_number in 1.. {
            let path = format!(
                "/api/v3/wanted/missing?page={}&pageSize={}&monitored=true{}",
                page_number, MISSING_PAGE_SIZE, extra_query
            );
            let page: MissingPage<T> = self.client.get(&path).await?;
            let fetched = page.records.len();
            records.extend(page.records);
            if fetched == 0 || records.len() as u64 >= page.total_records {
                break;
            }
        }
        debug!(kind = self.kind.as_str(), count = records.len(), "Fetched missing listing");
        Ok(records)
    }

    fn titles_path(&self) -> &'static str {
        match self.kind {
            MediaKind::Tv => "/api/v3/series",
            MediaKind::Movie => "/api/v3/movie",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTitle {
    id: u64,
    #[serde(default)]
    title: String,
    year: Option<u32>,
}

impl From<WireTitle> for Title {
    fn from(w: WireTitle) -> Self {
        Title {
            id: w.id,
            title: w.title,
            year: w.year.filter(|y| *y > 0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MissingPage<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
    #[serde(default)]
    total_records: u64,
}

/// A missing episode with its series embedded
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MissingEpisode {
    series_id: u64,
    series: Option<WireTitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEpisode {
    id: u64,
    series_id: u64,
    season_number: u32,
    episode_number: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    has_file: bool,
}

impl From<WireEpisode> for Episode {
    fn from(w: WireEpisode) -> Self {
        Episode {
            id: w.id,
            series_id: w.series_id,
            season_number: w.season_number,
            episode_number: w.episode_number,
            title: w.title,
            has_file: w.has_file,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRelease {
    guid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    movie_titles: Vec<String>,
    #[serde(default)]
    indexer_id: i64,
    #[serde(default)]
    indexer: String,
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    rejected: bool,
    #[serde(default)]
    rejections: Vec<String>,
    custom_format_score: Option<f64>,
    quality_weight: Option<f64>,
    size: Option<u64>,
    quality: Option<WireQualityModel>,
    #[serde(default)]
    languages: Vec<WireNamed>,
}

#[derive(Debug, Deserialize)]
struct WireQualityModel {
    quality: Option<WireNamed>,
}

#[derive(Debug, Deserialize)]
struct WireNamed {
    #[serde(default)]
    name: String,
}

impl From<WireRelease> for Release {
    fn from(w: WireRelease) -> Self {
        Release {
            guid: w.guid,
            title: w.title,
            movie_titles: w.movie_titles,
            indexer_id: w.indexer_id,
            indexer: w.indexer,
            protocol: w.protocol,
            approved: w.approved,
            rejected: w.rejected,
            rejections: w.rejections,
            custom_format_score: w.custom_format_score,
            quality_weight: w.quality_weight,
            size: w.size,
            quality: w
                .quality
                .and_then(|q| q.quality)
                .map(|q| q.name)
                .filter(|n| !n.is_empty()),
            languages: w
                .languages
                .into_iter()
                .map(|l| l.name)
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalPayload<'a> {
    guid: &'a str,
    indexer_id: i64,
    title: &'a str,
    protocol: &'a str,
}

/// Series that appear in a missing-episode listing, first-seen order
fn series_from_missing(records: Vec<MissingEpisode>) -> Vec<Title> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.series_id))
        .map(|r| match r.series {
            Some(series) => series.into(),
            None => Title {
                id: r.series_id,
                title: String::new(),
                year: None,
            },
        })
        .collect()
}

#[async_trait]
impl AcquisitionClient for ArrClient {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn list_titles(&self) -> RemoteResult<Vec<Title>> {
        let titles: Vec<WireTitle> = self.client.get(self.titles_path()).await?;
        Ok(titles.into_iter().map(Title::from).collect())
    }

    async fn list_missing(&self) -> RemoteResult<Vec<Title>> {
        let titles = match self.kind {
            MediaKind::Movie => self
                .missing_records::<WireTitle>("")
                .await?
                .into_iter()
                .map(Title::from)
                .collect(),
            MediaKind::Tv => {
                series_from_missing(self.missing_records::<MissingEpisode>("&includeSeries=true").await?)
            }
        };
        Ok(titles)
    }

    async fn list_episodes(&self, title_id: u64) -> RemoteResult<Vec<Episode>> {
        if self.kind != MediaKind::Tv {
            return Err(RemoteError::Unsupported("episodes of a movie".into()));
        }
        let episodes: Vec<WireEpisode> = self
            .client
            .get(&format!("/api/v3/episode?seriesId={}", title_id))
            .await?;
        Ok(episodes.into_iter().map(Episode::from).collect())
    }

    async fn list_releases(&self, scope: ReleaseScope) -> RemoteResult<Vec<Release>> {
        let path = match (self.kind, scope) {
            (MediaKind::Tv, ReleaseScope::Episode(id)) => format!("/api/v3/release?episodeId={}", id),
            (MediaKind::Movie, ReleaseScope::Movie(id)) => format!("/api/v3/release?movieId={}", id),
            (kind, scope) => {
                return Err(RemoteError::Unsupported(format!(
                    "{:?} releases from the {} service",
                    scope,
                    kind.as_str()
                )));
            }
        };
        let releases: Vec<WireRelease> = self.client.get(&path).await?;
        debug!(?scope, count = releases.len(), "Fetched releases");
        Ok(releases.into_iter().map(Release::from).collect())
    }

    async fn submit_approval(&self, release: &Release) -> RemoteResult<()> {
        let payload = ApprovalPayload {
            guid: &release.guid,
            indexer_id: release.indexer_id,
            title: release.display_title(),
            protocol: &release.protocol,
        };
        self.client.post_discard("/api/v3/release", &payload).await?;
        info!(guid = %release.guid, title = release.display_title(), "Release pushed to download client");
        Ok(())
    }
}

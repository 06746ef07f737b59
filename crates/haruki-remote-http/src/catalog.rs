//! Jellyseerr/Overseerr catalog client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haruki_api::{
    Candidate, CatalogUser, MediaDetail, MediaKind, MediaStatus, RequestReceipt, Requester, UserId,
    UserRequest,
};
use haruki_remote_api::{CatalogClient, IdentityLinker, RemoteResult};
use haruki_util::OwnerKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::{encode_query, JsonClient};

/// Page size when walking the user list
const USER_PAGE: u64 = 100;

/// Stop walking the user list after this many users
const USER_SCAN_LIMIT: u64 = 2000;

/// Page size when walking a user's requests
const REQUEST_PAGE: u64 = 100;

/// Stop walking a user's requests after this many
const REQUEST_SCAN_LIMIT: u64 = 2000;

pub struct JellyseerrClient {
    client: JsonClient,
}

impl JellyseerrClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self {
            client: JsonClient::new(base_url, api_key, timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    id: u64,
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    first_air_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    first_air_date: String,
    poster_path: Option<String>,
    media_info: Option<WireMediaInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMediaInfo {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    requests: Vec<WireRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    requested_by: WireUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: u64,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    settings: Option<WireUserSettings>,
}

impl From<WireUser> for CatalogUser {
    fn from(wire: WireUser) -> Self {
        CatalogUser {
            id: UserId(wire.id),
            display_name: wire.display_name,
            email: wire.email,
            external_id: wire
                .settings
                .and_then(|s| s.discord_id)
                .filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUserRequest {
    id: u64,
    #[serde(default, rename = "type")]
    request_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    is4k: bool,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    media: WireRequestMedia,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequestMedia {
    #[serde(default)]
    tmdb_id: u64,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    release_date: String,
}

impl WireUserRequest {
    fn kind(&self) -> Option<MediaKind> {
        MediaKind::parse(&self.request_type).or_else(|| MediaKind::parse(&self.media.media_type))
    }

    fn into_request(self) -> UserRequest {
        let kind = self.kind();
        let title = [self.title, self.media.title, self.media.name]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        UserRequest {
            id: self.id,
            kind,
            title,
            year: year_of(&self.media.release_date),
            media_status: MediaStatus::from_code(self.media.status),
            is_4k: self.is4k,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkPayload<'a> {
    discord_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUserSettings {
    discord_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPayload<'a> {
    media_type: &'a str,
    media_id: u64,
    user_id: u64,
    /// TV requests are rejected without a season selection
    #[serde(skip_serializing_if = "Option::is_none")]
    seasons: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestResponse {
    requested_by: Option<RequestedByCount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestedByCount {
    #[serde(default)]
    request_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    total_results: u32,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    results: u32,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: u64,
}

/// First four characters of a release date
fn year_of(date: &str) -> Option<String> {
    date.get(..4).map(str::to_string)
}

fn candidate_from_hit(hit: SearchHit, kind: MediaKind) -> Option<Candidate> {
    let hit_kind = if hit.media_type.is_empty() {
        kind
    } else {
        MediaKind::parse(&hit.media_type)?
    };
    if hit_kind != kind {
        return None;
    }

    let (title, date) = match kind {
        MediaKind::Tv => (
            if hit.name.is_empty() { hit.title } else { hit.name },
            if hit.first_air_date.is_empty() { hit.release_date } else { hit.first_air_date },
        ),
        MediaKind::Movie => (
            if hit.title.is_empty() { hit.name } else { hit.title },
            hit.release_date,
        ),
    };

    Some(Candidate {
        id: hit.id,
        kind,
        title,
        year: year_of(&date),
    })
}

fn detail_from_wire(wire: DetailResponse, kind: MediaKind) -> MediaDetail {
    let (title, date) = match kind {
        MediaKind::Tv if !wire.name.is_empty() => (wire.name, wire.first_air_date),
        MediaKind::Tv => (wire.title, wire.release_date),
        MediaKind::Movie if !wire.title.is_empty() => (wire.title, wire.release_date),
        MediaKind::Movie => (wire.name, wire.release_date),
    };
    let (status, requesters) = match wire.media_info {
        Some(info) => (
            MediaStatus::from_code(info.status),
            info.requests
                .into_iter()
                .map(|r| Requester {
                    id: UserId(r.requested_by.id),
                    display_name: r.requested_by.display_name,
                })
                .collect(),
        ),
        None => (MediaStatus::NotTracked, Vec::new()),
    };

    MediaDetail {
        id: wire.id,
        kind,
        title,
        year: year_of(&date),
        overview: wire.overview,
        poster_path: wire.poster_path.filter(|p| !p.is_empty()),
        status,
        requesters,
    }
}

#[async_trait]
impl CatalogClient for JellyseerrClient {
    async fn search(&self, query: &str, kind: MediaKind) -> RemoteResult<Vec<Candidate>> {
        let path = format!("/api/v1/search?query={}", encode_query(query));
        let response: SearchResponse = self.client.get(&path).await?;
        let candidates: Vec<Candidate> = response
            .results
            .into_iter()
            .filter_map(|hit| candidate_from_hit(hit, kind))
            .collect();
        debug!(query, kind = kind.as_str(), hits = candidates.len(), "Catalog search");
        Ok(candidates)
    }

    async fn detail(&self, kind: MediaKind, id: u64) -> RemoteResult<MediaDetail> {
        let path = format!("/api/v1/{}/{}?language=en", kind.as_str(), id);
        let wire: DetailResponse = self.client.get(&path).await?;
        Ok(detail_from_wire(wire, kind))
    }

    async fn submit_request(
        &self,
        kind: MediaKind,
        id: u64,
        user: UserId,
    ) -> RemoteResult<RequestReceipt> {
        let payload = RequestPayload {
            media_type: kind.as_str(),
            media_id: id,
            user_id: user.0,
            seasons: (kind == MediaKind::Tv).then_some("all"),
        };
        let response: RequestResponse = self.client.post("/api/v1/request", &payload).await?;
        Ok(RequestReceipt {
            request_count: response.requested_by.map(|r| r.request_count).unwrap_or(0),
        })
    }

    async fn user(&self, id: UserId) -> RemoteResult<CatalogUser> {
        let wire: WireUser = self.client.get(&format!("/api/v1/user/{}", id)).await?;
        Ok(wire.into())
    }

    async fn user_request_total(&self, id: UserId) -> RemoteResult<u32> {
        let path = format!("/api/v1/request?take=1&skip=0&requestedBy={}", id);
        let response: ListResponse<serde_json::Value> = self.client.get(&path).await?;
        let total = match response.page_info {
            Some(info) if response.total_results == 0 => info.results,
            _ => response.total_results,
        };
        Ok(total)
    }

    async fn user_requests(&self, id: UserId, include_finished: bool) -> RemoteResult<Vec<UserRequest>> {
        let mut requests = Vec::new();
        let mut skip = 0;
        while skip < REQUEST_SCAN_LIMIT {
            let path = format!("/api/v1/user/{}/requests?take={}&skip={}", id, REQUEST_PAGE, skip);
            let page: ListResponse<WireUserRequest> = self.client.get(&path).await?;
            let fetched = page.results.len() as u64;

            for wire in page.results {
                if !include_finished && MediaStatus::from_code(wire.media.status) == MediaStatus::Available {
                    continue;
                }
                let tmdb_id = wire.media.tmdb_id;
                let mut request = wire.into_request();
                // the list endpoint often omits titles
                if request.title.is_empty()
                    && tmdb_id != 0
                    && let Some(kind) = request.kind
                {
                    match self.detail(kind, tmdb_id).await {
                        Ok(detail) => {
                            request.title = detail.title;
                            if request.year.is_none() {
                                request.year = detail.year;
                            }
                        }
                        Err(e) => debug!(request = request.id, error = %e, "Title lookup failed"),
                    }
                }
                requests.push(request);
            }

            if fetched < REQUEST_PAGE {
                break;
            }
            skip += REQUEST_PAGE;
        }
        debug!(user = %id, count = requests.len(), include_finished, "Listed user requests");
        Ok(requests)
    }

    async fn list_users(&self) -> RemoteResult<Vec<CatalogUser>> {
        let mut users = Vec::new();
        let mut skip = 0;
        while skip < USER_SCAN_LIMIT {
            let path = format!("/api/v1/user?take={}&skip={}", USER_PAGE, skip);
            let page: ListResponse<UserRef> = self.client.get(&path).await?;
            if page.results.is_empty() {
                break;
            }

            for user_ref in &page.results {
                match self.user(UserId(user_ref.id)).await {
                    Ok(user) => users.push(user),
                    Err(e) => warn!(user = user_ref.id, error = %e, "Skipping unreadable catalog user"),
                }
            }

            if (page.results.len() as u64) < USER_PAGE {
                break;
            }
            skip += USER_PAGE;
        }
        Ok(users)
    }

    async fn link_external_identity(&self, id: UserId, owner: &OwnerKey) -> RemoteResult<()> {
        let path = format!("/api/v1/user/{}/settings", id);
        self.client
            .put_discard(&path, &LinkPayload { discord_id: owner.as_str() })
            .await?;
        debug!(user = %id, owner = %owner, "Linked catalog identity");
        Ok(())
    }
}

#[async_trait]
impl IdentityLinker for JellyseerrClient {
    async fn resolve_external_identity(&self, owner: &OwnerKey) -> RemoteResult<Option<UserId>> {
        let mut skip = 0;
        while skip < USER_SCAN_LIMIT {
            let path = format!("/api/v1/user?take={}&skip={}", USER_PAGE, skip);
            let page: ListResponse<UserRef> = self.client.get(&path).await?;
            if page.results.is_empty() {
                break;
            }

            for user_ref in &page.results {
                match self.user(UserId(user_ref.id)).await {
                    Ok(user) if user.external_id.as_deref() == Some(owner.as_str()) => {
                        debug!(owner = %owner, user = %user.id, "Resolved catalog identity");
                        return Ok(Some(user.id));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(user = user_ref.id, error = %e, "Skipping unreadable catalog user");
                    }
                }
            }

            if (page.results.len() as u64) < USER_PAGE {
                break;
            }
            skip += USER_PAGE;
        }

        debug!(owner = %owner, "No catalog user linked");
        Ok(None)
    }
}

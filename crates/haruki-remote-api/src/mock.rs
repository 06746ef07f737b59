//! In-memory collaborators for unit and integration testing

use async_trait::async_trait;
use haruki_api::{
    Candidate, CatalogUser, Episode, MediaDetail, MediaKind, PlaybackSession, Release,
    ReleaseScope, RequestReceipt, Title, UserId, UserRequest, View, ViewRef,
};
use haruki_util::OwnerKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{
    AcquisitionClient, ActivityClient, CatalogClient, IdentityLinker, RemoteError, RemoteResult,
    ViewSink,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A request the mock catalog accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRequest {
    pub kind: MediaKind,
    pub media_id: u64,
    pub user: UserId,
}

/// Mock catalog service
#[derive(Default)]
pub struct MockCatalog {
    pub candidates: Arc<Mutex<Vec<Candidate>>>,
    pub details: Arc<Mutex<HashMap<u64, MediaDetail>>>,
    pub users: Arc<Mutex<HashMap<UserId, CatalogUser>>>,
    pub request_totals: Arc<Mutex<HashMap<UserId, u32>>>,
    /// `request_count` reported back by `submit_request`
    pub receipt_count: Arc<Mutex<u32>>,
    pub submitted: Arc<Mutex<Vec<SubmittedRequest>>>,
    pub user_requests: Arc<Mutex<HashMap<UserId, Vec<UserRequest>>>>,
    /// Identities stored through `link_external_identity`
    pub linked: Arc<Mutex<Vec<(UserId, OwnerKey)>>>,

    /// Configure search to fail
    pub fail_search: Arc<Mutex<bool>>,

    /// Configure request submission to fail
    pub fail_submit: Arc<Mutex<bool>>,

    /// Configure user listing and linking to fail
    pub fail_users: Arc<Mutex<bool>>,

    /// Simulated latency of detail and user lookups
    pub lookup_delay: Arc<Mutex<Option<Duration>>>,

    detail_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(self, candidates: Vec<Candidate>) -> Self {
        *lock(&self.candidates) = candidates;
        self
    }

    pub fn with_detail(self, detail: MediaDetail) -> Self {
        lock(&self.details).insert(detail.id, detail);
        self
    }

    pub fn with_user(self, user: CatalogUser) -> Self {
        lock(&self.users).insert(user.id, user);
        self
    }

    /// Replace the detail served for an id (e.g. a status change)
    pub fn set_detail(&self, detail: MediaDetail) {
        lock(&self.details).insert(detail.id, detail);
    }

    pub fn set_request_total(&self, user: UserId, total: u32) {
        lock(&self.request_totals).insert(user, total);
    }

    pub fn with_user_requests(self, user: UserId, requests: Vec<UserRequest>) -> Self {
        lock(&self.user_requests).insert(user, requests);
        self
    }

    pub fn linked(&self) -> Vec<(UserId, OwnerKey)> {
        lock(&self.linked).clone()
    }

    pub fn set_lookup_delay(&self, delay: Option<Duration>) {
        *lock(&self.lookup_delay) = delay;
    }

    async fn lookup_latency(&self) {
        let delay = *lock(&self.lookup_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn submitted(&self) -> Vec<SubmittedRequest> {
        lock(&self.submitted).clone()
    }

    /// How many times detail was fetched
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn search(&self, query: &str, kind: MediaKind) -> RemoteResult<Vec<Candidate>> {
        if *lock(&self.fail_search) {
            return Err(RemoteError::http(500, "mock search failure"));
        }
        let query = query.to_lowercase();
        Ok(lock(&self.candidates)
            .iter()
            .filter(|c| c.kind == kind && c.title.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn detail(&self, _kind: MediaKind, id: u64) -> RemoteResult<MediaDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup_latency().await;
        lock(&self.details)
            .get(&id)
            .cloned()
            .ok_or_else(|| RemoteError::http(404, format!("media {} not found", id)))
    }

    async fn submit_request(
        &self,
        kind: MediaKind,
        id: u64,
        user: UserId,
    ) -> RemoteResult<RequestReceipt> {
        if *lock(&self.fail_submit) {
            return Err(RemoteError::http(500, "mock request failure"));
        }
        lock(&self.submitted).push(SubmittedRequest {
            kind,
            media_id: id,
            user,
        });
        Ok(RequestReceipt {
            request_count: *lock(&self.receipt_count),
        })
    }

    async fn user(&self, id: UserId) -> RemoteResult<CatalogUser> {
        self.lookup_latency().await;
        lock(&self.users)
            .get(&id)
            .cloned()
            .ok_or_else(|| RemoteError::http(404, format!("user {} not found", id)))
    }

    async fn user_request_total(&self, id: UserId) -> RemoteResult<u32> {
        self.lookup_latency().await;
        Ok(lock(&self.request_totals).get(&id).copied().unwrap_or(0))
    }

    async fn user_requests(&self, id: UserId, include_finished: bool) -> RemoteResult<Vec<UserRequest>> {
        self.lookup_latency().await;
        Ok(lock(&self.user_requests)
            .get(&id)
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| include_finished || !r.is_finished())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_users(&self) -> RemoteResult<Vec<CatalogUser>> {
        if *lock(&self.fail_users) {
            return Err(RemoteError::http(500, "mock user listing failure"));
        }
        self.lookup_latency().await;
        let mut users: Vec<CatalogUser> = lock(&self.users).values().cloned().collect();
        users.sort_by_key(|u| u.id.0);
        Ok(users)
    }

    async fn link_external_identity(&self, id: UserId, owner: &OwnerKey) -> RemoteResult<()> {
        if *lock(&self.fail_users) {
            return Err(RemoteError::http(500, "mock link failure"));
        }
        let mut users = lock(&self.users);
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RemoteError::http(404, format!("user {} not found", id)))?;
        user.external_id = Some(owner.as_str().to_string());
        lock(&self.linked).push((id, owner.clone()));
        Ok(())
    }
}

/// Mock identity linker backed by a fixed map
#[derive(Default)]
pub struct MockIdentity {
    pub links: Arc<Mutex<HashMap<OwnerKey, UserId>>>,

    /// Configure resolution to fail
    pub fail: Arc<Mutex<bool>>,

    /// Simulated latency of every resolution
    pub delay: Arc<Mutex<Option<Duration>>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(self, owner: impl Into<OwnerKey>, user: UserId) -> Self {
        lock(&self.links).insert(owner.into(), user);
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }
}

#[async_trait]
impl IdentityLinker for MockIdentity {
    async fn resolve_external_identity(&self, owner: &OwnerKey) -> RemoteResult<Option<UserId>> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *lock(&self.fail) {
            return Err(RemoteError::Transport("mock identity failure".into()));
        }
        Ok(lock(&self.links).get(owner).copied())
    }
}

/// Mock series/movie acquisition service
pub struct MockAcquisition {
    kind: MediaKind,
    pub titles: Arc<Mutex<Vec<Title>>>,
    pub missing: Arc<Mutex<Vec<Title>>>,
    pub episodes: Arc<Mutex<HashMap<u64, Vec<Episode>>>>,
    pub releases: Arc<Mutex<HashMap<ReleaseScope, Vec<Release>>>>,
    pub approvals: Arc<Mutex<Vec<Release>>>,

    /// Simulated latency of release lookups
    pub release_delay: Arc<Mutex<Option<Duration>>>,

    /// Configure release lookups to fail with this message
    pub fail_releases: Arc<Mutex<Option<String>>>,

    /// Configure approval to fail
    pub fail_approval: Arc<Mutex<bool>>,
}

impl MockAcquisition {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            titles: Arc::new(Mutex::new(Vec::new())),
            missing: Arc::new(Mutex::new(Vec::new())),
            episodes: Arc::new(Mutex::new(HashMap::new())),
            releases: Arc::new(Mutex::new(HashMap::new())),
            approvals: Arc::new(Mutex::new(Vec::new())),
            release_delay: Arc::new(Mutex::new(None)),
            fail_releases: Arc::new(Mutex::new(None)),
            fail_approval: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_titles(self, titles: Vec<Title>) -> Self {
        *lock(&self.titles) = titles;
        self
    }

    pub fn with_missing(self, titles: Vec<Title>) -> Self {
        *lock(&self.missing) = titles;
        self
    }

    pub fn with_episodes(self, series_id: u64, episodes: Vec<Episode>) -> Self {
        lock(&self.episodes).insert(series_id, episodes);
        self
    }

    pub fn with_releases(self, scope: ReleaseScope, releases: Vec<Release>) -> Self {
        lock(&self.releases).insert(scope, releases);
        self
    }

    pub fn set_release_delay(&self, delay: Option<Duration>) {
        *lock(&self.release_delay) = delay;
    }

    pub fn approvals(&self) -> Vec<Release> {
        lock(&self.approvals).clone()
    }
}

#[async_trait]
impl AcquisitionClient for MockAcquisition {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn list_titles(&self) -> RemoteResult<Vec<Title>> {
        Ok(lock(&self.titles).clone())
    }

    async fn list_missing(&self) -> RemoteResult<Vec<Title>> {
        Ok(lock(&self.missing).clone())
    }

    async fn list_episodes(&self, title_id: u64) -> RemoteResult<Vec<Episode>> {
        if self.kind != MediaKind::Tv {
            return Err(RemoteError::Unsupported("episodes of a movie".into()));
        }
        Ok(lock(&self.episodes).get(&title_id).cloned().unwrap_or_default())
    }

    async fn list_releases(&self, scope: ReleaseScope) -> RemoteResult<Vec<Release>> {
        let delay = *lock(&self.release_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = lock(&self.fail_releases).clone() {
            return Err(RemoteError::http(500, msg));
        }
        Ok(lock(&self.releases).get(&scope).cloned().unwrap_or_default())
    }

    async fn submit_approval(&self, release: &Release) -> RemoteResult<()> {
        if *lock(&self.fail_approval) {
            return Err(RemoteError::http(400, "mock approval failure"));
        }
        lock(&self.approvals).push(release.clone());
        Ok(())
    }
}

/// Mock activity monitor
#[derive(Default)]
pub struct MockActivity {
    pub sessions: Arc<Mutex<Vec<PlaybackSession>>>,

    /// Configure the lookup to fail
    pub fail: Arc<Mutex<bool>>,

    /// Simulated latency of every lookup
    pub delay: Arc<Mutex<Option<Duration>>>,
}

impl MockActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(self, sessions: Vec<PlaybackSession>) -> Self {
        *lock(&self.sessions) = sessions;
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }
}

#[async_trait]
impl ActivityClient for MockActivity {
    async fn current_activity(&self) -> RemoteResult<Vec<PlaybackSession>> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *lock(&self.fail) {
            return Err(RemoteError::Transport("mock activity failure".into()));
        }
        Ok(lock(&self.sessions).clone())
    }
}

/// A message the mock sink was asked to post
#[derive(Debug, Clone, PartialEq)]
pub struct PostedView {
    pub channel_id: String,
    pub content: String,
    pub view: View,
}

/// Records every view pushed to it
#[derive(Default)]
pub struct MockViewSink {
    pub edits: Arc<Mutex<Vec<(ViewRef, View)>>>,
    pub posts: Arc<Mutex<Vec<PostedView>>>,

    /// Configure every push to fail as if the target vanished
    pub fail: Arc<Mutex<bool>>,
}

impl MockViewSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edits(&self) -> Vec<(ViewRef, View)> {
        lock(&self.edits).clone()
    }

    /// Edits aimed at one message, in order
    pub fn edits_for(&self, target: &ViewRef) -> Vec<View> {
        lock(&self.edits)
            .iter()
            .filter(|(t, _)| t == target)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn posts(&self) -> Vec<PostedView> {
        lock(&self.posts).clone()
    }
}

#[async_trait]
impl ViewSink for MockViewSink {
    async fn edit(&self, target: &ViewRef, view: View) -> RemoteResult<()> {
        if *lock(&self.fail) {
            return Err(RemoteError::ViewGone(target.to_string()));
        }
        lock(&self.edits).push((target.clone(), view));
        Ok(())
    }

    async fn post(&self, channel_id: &str, content: String, view: View) -> RemoteResult<()> {
        if *lock(&self.fail) {
            return Err(RemoteError::ViewGone(channel_id.to_string()));
        }
        lock(&self.posts).push(PostedView {
            channel_id: channel_id.to_string(),
            content,
            view,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haruki_api::Card;

    #[tokio::test]
    async fn mock_catalog_filters_by_kind_and_title() {
        let catalog = MockCatalog::new().with_candidates(vec![
            Candidate { id: 1, kind: MediaKind::Movie, title: "Foo".into(), year: None },
            Candidate { id: 2, kind: MediaKind::Tv, title: "Foo Show".into(), year: None },
        ]);

        let hits = catalog.search("foo", MediaKind::Tv).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[tokio::test]
    async fn mock_catalog_links_identity() {
        let catalog = MockCatalog::new().with_user(CatalogUser {
            id: UserId(3),
            display_name: "cy".into(),
            email: String::new(),
            external_id: None,
        });

        catalog
            .link_external_identity(UserId(3), &OwnerKey::from("777"))
            .await
            .unwrap();
        let users = catalog.list_users().await.unwrap();
        assert_eq!(users[0].external_id.as_deref(), Some("777"));
        assert_eq!(catalog.linked(), vec![(UserId(3), OwnerKey::from("777"))]);

        let missing = catalog.link_external_identity(UserId(9), &OwnerKey::from("777")).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn mock_sink_failure() {
        let sink = MockViewSink::new();
        *sink.fail.lock().unwrap() = true;

        let result = sink
            .edit(&ViewRef::new("c", "m"), View::terminal(Card::new("x", "")))
            .await;
        assert!(matches!(result, Err(RemoteError::ViewGone(_))));
        assert!(sink.edits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mock_release_delay_is_observed() {
        let acq = MockAcquisition::new(MediaKind::Tv);
        acq.set_release_delay(Some(Duration::from_secs(90)));

        let start = tokio::time::Instant::now();
        let releases = acq.list_releases(ReleaseScope::Episode(1)).await.unwrap();
        assert!(releases.is_empty());
        assert!(start.elapsed() >= Duration::from_secs(90));
    }
}

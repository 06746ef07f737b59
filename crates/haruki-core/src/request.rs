//! Request wizard: search the catalog, pick an item, request it or get notified
//!
//! ```text
//! invoke -> Listing -> DetailSelected -> RequestSent
//!                          |      \----> AlreadyAvailable
//!                          v
//!                    NotifyOffered ----> NotificationRequested
//! ```
//! Abort ends the session from any step.

use haruki_api::{
    Caller, Candidate, ComponentId, MediaDetail, MediaKind, MediaStatus, Reply, UserId, View,
    ViewRef, MAX_SELECT_OPTIONS,
};
use haruki_config::WizardSettings;
use haruki_remote_api::{
    with_deadline, CatalogClient, IdentityLinker, RemoteError, RemoteResult, ViewSink,
};
use haruki_store::SessionStore;
use haruki_util::{OwnerKey, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{may_act_for, parse_value, role_denied};
use crate::render;
use crate::watcher::spawn_expiry_watcher;

pub const CATALOG_NOT_CONFIGURED: &str = "Catalog service is not configured.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStep {
    Listing,
    DetailSelected,
    /// Already requested or partially available; the caller may ask to be notified
    NotifyOffered,
}

/// Snapshot of one request wizard session
#[derive(Debug, Clone)]
pub struct RequestSession {
    pub owner: OwnerKey,
    pub kind: MediaKind,
    pub query: String,
    pub candidates: Vec<Candidate>,
    pub selected: Option<u64>,
    pub step: RequestStep,
    /// Message the wizard lives in
    pub view: ViewRef,
}

pub struct RequestWizard {
    settings: WizardSettings,
    catalog: Option<Arc<dyn CatalogClient>>,
    identity: Option<Arc<dyn IdentityLinker>>,
    sink: Arc<dyn ViewSink>,
    store: Arc<SessionStore<RequestSession>>,
}

impl RequestWizard {
    pub fn new(
        settings: WizardSettings,
        catalog: Option<Arc<dyn CatalogClient>>,
        identity: Option<Arc<dyn IdentityLinker>>,
        sink: Arc<dyn ViewSink>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(settings.session_ttl));
        Self {
            settings,
            catalog,
            identity,
            sink,
            store,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore<RequestSession>> {
        &self.store
    }

    pub fn is_configured(&self) -> bool {
        self.catalog.is_some()
    }

    /// Start a session: search the catalog and list the hits
    pub async fn invoke(&self, caller: &Caller, target: ViewRef, media_type: &str, query: &str) -> Reply {
        if let Some(denied) = role_denied(&self.settings, caller) {
            return denied;
        }
        let Some(kind) = MediaKind::parse(media_type) else {
            return Reply::ephemeral("Media type must be `tv` or `movie`.");
        };
        let query = query.trim();
        if query.is_empty() {
            return Reply::ephemeral("Please provide a search query.");
        }
        let Some(catalog) = &self.catalog else {
            return Reply::ephemeral(CATALOG_NOT_CONFIGURED);
        };

        let mut candidates =
            match with_deadline(self.settings.search_timeout, catalog.search(query, kind)).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(owner = %caller.owner, query, error = %e, "Catalog search failed");
                    return Reply::render(View::notice(format!("Search failed: {}", e)));
                }
            };
        if candidates.is_empty() {
            return Reply::render(View::notice(format!("No results for `{}`.", query)));
        }
        candidates.truncate(MAX_SELECT_OPTIONS);

        let view = render::request_results(query, &candidates);
        let session_id = self.store.set(
            caller.owner.clone(),
            RequestSession {
                owner: caller.owner.clone(),
                kind,
                query: query.to_string(),
                candidates,
                selected: None,
                step: RequestStep::Listing,
                view: target.clone(),
            },
        );
        info!(
            owner = %caller.owner,
            session = %session_id,
            kind = kind.as_str(),
            query,
            "Request session started"
        );
        spawn_expiry_watcher(
            self.store.clone(),
            caller.owner.clone(),
            session_id,
            target,
            self.sink.clone(),
        );

        Reply::render(view)
    }

    /// The caller's live session, if this event came from its message.
    /// Refreshes the deadline.
    fn session_for(&self, caller: &Caller, target: &ViewRef) -> Option<RequestSession> {
        let session = self.store.get(&caller.owner)?;
        if session.view != *target {
            debug!(owner = %caller.owner, view = %target, "Event from a foreign or stale view");
            return None;
        }
        self.store.touch(&caller.owner);
        Some(session)
    }

    async fn fetch_detail(&self, kind: MediaKind, id: u64) -> RemoteResult<MediaDetail> {
        match &self.catalog {
            Some(catalog) => with_deadline(self.settings.search_timeout, catalog.detail(kind, id)).await,
            None => Err(RemoteError::Unsupported(CATALOG_NOT_CONFIGURED.to_string())),
        }
    }

    async fn resolve_identity(&self, owner: &OwnerKey) -> RemoteResult<Option<UserId>> {
        match &self.identity {
            Some(identity) => {
                with_deadline(
                    self.settings.search_timeout,
                    identity.resolve_external_identity(owner),
                )
                .await
            }
            None => Ok(None),
        }
    }

    async fn submit(&self, kind: MediaKind, id: u64, user: UserId) -> RemoteResult<u32> {
        match &self.catalog {
            Some(catalog) => {
                let receipt =
                    with_deadline(self.settings.search_timeout, catalog.submit_request(kind, id, user))
                        .await?;
                Ok(receipt.request_count)
            }
            None => Err(RemoteError::Unsupported(CATALOG_NOT_CONFIGURED.to_string())),
        }
    }

    /// An item was picked from the result list
    pub async fn select(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        let Some(session) = self.session_for(caller, target) else {
            return Ok(Reply::Silent);
        };
        let id: u64 = parse_value(ComponentId::RequestSelect, values)?;
        if !session.candidates.iter().any(|c| c.id == id) {
            self.store.clear(&caller.owner);
            return Ok(Reply::render(View::closing_notice("Media not found.")));
        }

        let detail = match self.fetch_detail(session.kind, id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(owner = %caller.owner, media_id = id, error = %e, "Detail fetch failed");
                return Ok(Reply::render(View::notice(format!("Failed to load details: {}", e))));
            }
        };

        self.store.update(&caller.owner, |s| {
            s.selected = Some(id);
            s.step = RequestStep::DetailSelected;
        });
        debug!(owner = %caller.owner, media_id = id, "Request item selected");
        Ok(Reply::render(render::request_detail(&detail, &session.candidates)))
    }

    /// Request the selected item, branching on its live availability
    pub async fn confirm(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(session) = self.session_for(caller, target) else {
            return Reply::Silent;
        };
        let Some(id) = session.selected else {
            return Reply::Silent;
        };

        // never trust a cached status here
        let detail = match self.fetch_detail(session.kind, id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(owner = %caller.owner, media_id = id, error = %e, "Detail fetch failed");
                return Reply::render(View::notice(format!("Failed to load details: {}", e)));
            }
        };

        match detail.status {
            MediaStatus::Available => {
                self.store.clear(&caller.owner);
                info!(owner = %caller.owner, media_id = id, "Media already available");
                Reply::render(render::already_available(&detail))
            }
            MediaStatus::PartiallyAvailable => {
                self.offer_notify(&caller.owner);
                Reply::render(render::partial_availability(&detail))
            }
            status if status.is_requested() => {
                self.offer_notify(&caller.owner);
                Reply::render(render::already_requested(&detail))
            }
            _ => self.create_request(caller, &detail).await,
        }
    }

    fn offer_notify(&self, owner: &OwnerKey) {
        self.store.update(owner, |s| s.step = RequestStep::NotifyOffered);
        debug!(owner = %owner, "Notify offered");
    }

    async fn create_request(&self, caller: &Caller, detail: &MediaDetail) -> Reply {
        let user = match self.resolve_identity(&caller.owner).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!(owner = %caller.owner, "Caller has no linked catalog account");
                return Reply::render(View::notice("Your ID is not linked in the catalog."));
            }
            Err(e) => {
                warn!(owner = %caller.owner, error = %e, "Identity lookup failed");
                return Reply::render(View::notice("Failed to link your ID in the catalog."));
            }
        };

        if detail.has_requester(user) {
            self.store.clear(&caller.owner);
            return Reply::render(render::already_requester());
        }

        match self.submit(detail.kind, detail.id, user).await {
            Ok(previous) => {
                self.store.clear(&caller.owner);
                info!(owner = %caller.owner, user = %user, media_id = detail.id, "Request sent");
                Reply::render(render::request_sent(detail, caller.name(), previous + 1))
            }
            Err(e) => {
                warn!(owner = %caller.owner, media_id = detail.id, error = %e, "Request failed");
                Reply::render(View::notice(format!("Request failed: {}", e)))
            }
        }
    }

    /// Join the watcher list of an item someone else already requested
    pub async fn notify(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(session) = self.session_for(caller, target) else {
            return Reply::Silent;
        };
        let (Some(id), RequestStep::NotifyOffered) = (session.selected, session.step) else {
            return Reply::Silent;
        };

        let user = match self.resolve_identity(&caller.owner).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(_) => {
                self.store.clear(&caller.owner);
                return Reply::render(render::notify_not_linked());
            }
        };

        let detail = match self.fetch_detail(session.kind, id).await {
            Ok(detail) => detail,
            Err(e) => {
                return Reply::render(View::notice(format!("Failed to load details: {}", e)));
            }
        };
        if detail.has_requester(user) {
            self.store.clear(&caller.owner);
            return Reply::render(render::notify_already_watching());
        }

        match self.submit(session.kind, id, user).await {
            Ok(_) => {
                self.store.clear(&caller.owner);
                info!(owner = %caller.owner, media_id = id, "Added to watcher list");
                Reply::render(render::notify_requested())
            }
            Err(e) => {
                warn!(owner = %caller.owner, media_id = id, error = %e, "Notify request failed");
                Reply::render(View::notice(format!("Notify request failed: {}", e)))
            }
        }
    }

    /// Abort the session shown in `target`; owner or privileged callers only
    pub fn abort(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(owner) = self.store.find_owner(|s| s.view == *target) else {
            return Reply::Silent;
        };
        if !may_act_for(&self.settings, caller, &owner) {
            debug!(caller = %caller.owner, owner = %owner, "Ignoring abort from non-owner");
            return Reply::Silent;
        }
        self.store.clear(&owner);
        info!(owner = %owner, by = %caller.owner, "Request session aborted");
        Reply::render(render::request_aborted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haruki_api::Requester;
    use haruki_remote_api::{MockCatalog, MockIdentity, MockViewSink};
    use std::time::Duration;

    fn candidate(id: u64, title: &str) -> Candidate {
        Candidate {
            id,
            kind: MediaKind::Movie,
            title: title.into(),
            year: None,
        }
    }

    fn detail(id: u64, status: MediaStatus, requesters: Vec<Requester>) -> MediaDetail {
        MediaDetail {
            id,
            kind: MediaKind::Movie,
            title: format!("Movie {}", id),
            year: Some("2001".into()),
            overview: "overview".into(),
            poster_path: None,
            status,
            requesters,
        }
    }

    struct Fixture {
        wizard: RequestWizard,
        catalog: Arc<MockCatalog>,
        identity: Arc<MockIdentity>,
        caller: Caller,
        target: ViewRef,
    }

    fn fixture(status: MediaStatus) -> Fixture {
        let catalog = Arc::new(
            MockCatalog::new()
                .with_candidates(vec![candidate(1, "Foo"), candidate(2, "Foo Two")])
                .with_detail(detail(2, status, vec![])),
        );
        let identity = Arc::new(MockIdentity::new().with_link("u1", UserId(7)));
        let wizard = RequestWizard::new(
            WizardSettings::default(),
            Some(catalog.clone()),
            Some(identity.clone()),
            Arc::new(MockViewSink::new()),
        );
        Fixture {
            wizard,
            catalog,
            identity,
            caller: Caller::new("u1", "ann"),
            target: ViewRef::new("c1", "m1"),
        }
    }

    async fn to_detail(f: &Fixture) {
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;
        f.wizard
            .select(&f.caller, &f.target, &["2".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn not_configured_creates_no_session() {
        let wizard = RequestWizard::new(
            WizardSettings::default(),
            None,
            None,
            Arc::new(MockViewSink::new()),
        );
        let reply = wizard
            .invoke(&Caller::new("u1", "ann"), ViewRef::new("c", "m"), "movie", "foo")
            .await;
        assert_eq!(reply, Reply::ephemeral(CATALOG_NOT_CONFIGURED));
        assert_eq!(wizard.store().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_search_creates_no_session() {
        let f = fixture(MediaStatus::NotTracked);
        let reply = f.wizard.invoke(&f.caller, f.target.clone(), "movie", "zzz").await;
        assert_eq!(reply.view().unwrap().content.as_deref(), Some("No results for `zzz`."));
        assert_eq!(f.wizard.store().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bad_media_type_is_refused() {
        let f = fixture(MediaStatus::NotTracked);
        let reply = f.wizard.invoke(&f.caller, f.target.clone(), "anime", "foo").await;
        assert!(matches!(reply, Reply::Ephemeral { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_an_unlisted_id_ends_the_session() {
        let f = fixture(MediaStatus::NotTracked);
        f.catalog.set_detail(detail(99, MediaStatus::NotTracked, vec![]));
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;

        let reply = f
            .wizard
            .select(&f.caller, &f.target, &["99".to_string()])
            .await
            .unwrap();
        let view = reply.view().unwrap();
        assert_eq!(view.content.as_deref(), Some("Media not found."));
        assert!(view.clears_controls());
        assert!(f.wizard.store().get(&f.caller.owner).is_none());
        assert_eq!(f.catalog.detail_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn untracked_item_is_requested() {
        let f = fixture(MediaStatus::NotTracked);
        *f.catalog.receipt_count.lock().unwrap() = 4;
        to_detail(&f).await;

        let reply = f.wizard.confirm(&f.caller, &f.target).await;
        let card = reply.view().unwrap().first_card().unwrap().clone();
        assert_eq!(card.author.as_deref(), Some("Movie Request Sent"));
        assert_eq!(card.field_value("Total Requests"), Some("5"));
        assert_eq!(card.field_value("Requested By"), Some("ann"));
        assert_eq!(f.catalog.submitted().len(), 1);
        assert!(f.wizard.store().get(&f.caller.owner).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unlinked_identity_keeps_session_for_retry() {
        let f = fixture(MediaStatus::NotTracked);
        f.identity.links.lock().unwrap().clear();
        to_detail(&f).await;

        let reply = f.wizard.confirm(&f.caller, &f.target).await;
        let view = reply.view().unwrap();
        assert_eq!(view.content.as_deref(), Some("Your ID is not linked in the catalog."));
        assert!(view.rows.is_none());

        let session = f.wizard.store().get(&f.caller.owner).unwrap();
        assert_eq!(session.step, RequestStep::DetailSelected);
        assert!(f.catalog.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn identity_failure_is_soft() {
        let f = fixture(MediaStatus::NotTracked);
        *f.identity.fail.lock().unwrap() = true;
        to_detail(&f).await;

        let reply = f.wizard.confirm(&f.caller, &f.target).await;
        assert_eq!(
            reply.view().unwrap().content.as_deref(),
            Some("Failed to link your ID in the catalog.")
        );
        assert!(f.wizard.store().get(&f.caller.owner).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn existing_requester_is_told_so() {
        let f = fixture(MediaStatus::NotTracked);
        f.catalog.set_detail(detail(
            2,
            MediaStatus::NotTracked,
            vec![Requester { id: UserId(7), display_name: "ann".into() }],
        ));
        to_detail(&f).await;

        let reply = f.wizard.confirm(&f.caller, &f.target).await;
        assert_eq!(reply.view().unwrap().first_card().unwrap().title, "ℹ️ Already Requested");
        assert!(f.catalog.submitted().is_empty());
        assert!(f.wizard.store().get(&f.caller.owner).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_rereads_live_status() {
        let f = fixture(MediaStatus::NotTracked);
        to_detail(&f).await;
        f.catalog.set_detail(detail(
            2,
            MediaStatus::Processing,
            vec![Requester { id: UserId(3), display_name: "bob".into() }],
        ));

        let reply = f.wizard.confirm(&f.caller, &f.target).await;
        let view = reply.view().unwrap();
        assert!(view.has_control(ComponentId::RequestNotify));
        assert_eq!(view.first_card().unwrap().field_value("Requested by"), Some("bob"));
        assert_eq!(f.catalog.detail_calls(), 2);

        let session = f.wizard.store().get(&f.caller.owner).unwrap();
        assert_eq!(session.step, RequestStep::NotifyOffered);
    }

    #[tokio::test(start_paused = true)]
    async fn notify_adds_caller_to_watchers() {
        let f = fixture(MediaStatus::PartiallyAvailable);
        to_detail(&f).await;
        let offered = f.wizard.confirm(&f.caller, &f.target).await;
        assert!(offered.view().unwrap().first_card().unwrap().title.starts_with("⚠️ Partial Availability"));

        let reply = f.wizard.notify(&f.caller, &f.target).await;
        assert_eq!(reply.view().unwrap().first_card().unwrap().title, "🔔 Notification Requested");
        assert_eq!(f.catalog.submitted().len(), 1);
        assert!(f.wizard.store().get(&f.caller.owner).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn notify_failure_keeps_session() {
        let f = fixture(MediaStatus::Pending);
        to_detail(&f).await;
        f.wizard.confirm(&f.caller, &f.target).await;
        *f.catalog.fail_submit.lock().unwrap() = true;

        let reply = f.wizard.notify(&f.caller, &f.target).await;
        let content = reply.view().unwrap().content.clone().unwrap();
        assert!(content.starts_with("Notify request failed: "));
        assert!(f.wizard.store().get(&f.caller.owner).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn notify_without_offer_is_ignored() {
        let f = fixture(MediaStatus::NotTracked);
        to_detail(&f).await;
        assert!(f.wizard.notify(&f.caller, &f.target).await.is_silent());
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_other_views_are_ignored() {
        let f = fixture(MediaStatus::NotTracked);
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;

        let reply = f
            .wizard
            .select(&f.caller, &ViewRef::new("c1", "other"), &["2".to_string()])
            .await
            .unwrap();
        assert!(reply.is_silent());
        assert_eq!(f.catalog.detail_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_selection_is_a_protocol_error() {
        let f = fixture(MediaStatus::NotTracked);
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;
        assert!(f
            .wizard
            .select(&f.caller, &f.target, &["two".to_string()])
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_is_owner_or_privileged_only() {
        let f = fixture(MediaStatus::NotTracked);
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;

        let stranger = Caller::new("u2", "bob");
        assert!(f.wizard.abort(&stranger, &f.target).is_silent());
        assert!(f.wizard.store().get(&f.caller.owner).is_some());

        let admin = Caller::new("u3", "root").privileged();
        let reply = f.wizard.abort(&admin, &f.target);
        assert_eq!(reply.view().unwrap().first_card().unwrap().title, "Aborted");
        assert!(f.wizard.store().get(&f.caller.owner).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn actions_refresh_the_deadline() {
        let f = fixture(MediaStatus::NotTracked);
        f.wizard.invoke(&f.caller, f.target.clone(), "movie", "foo").await;
        let first = f.wizard.store().deadline(&f.caller.owner).unwrap();

        tokio::time::sleep(Duration::from_secs(100)).await;
        f.wizard
            .select(&f.caller, &f.target, &["2".to_string()])
            .await
            .unwrap();

        let refreshed = f.wizard.store().deadline(&f.caller.owner).unwrap();
        assert_eq!(refreshed.duration_since(first), Duration::from_secs(100));
    }
}

//! Remediation wizard: find a title with missing files and grab a release
//!
//! ```text
//! invoke -> MediaSearch --(series)--> SeasonSelect -> EpisodeSelect --\
//!                 \--------(movie)------------------------------------> ReleaseSearch
//! ReleaseSearch <-> ReleaseSelected -> Approved
//! ```
//! Media, episode and release lists page independently. Abort ends the session
//! from any step.

use haruki_api::{
    Caller, ComponentId, Episode, ListingMode, MediaKind, Release, ReleaseScope, Reply, Title,
    View, ViewRef,
};
use haruki_config::WizardSettings;
use haruki_remote_api::{with_deadline, AcquisitionClient, ViewSink};
use haruki_store::SessionStore;
use haruki_util::{OwnerKey, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{first_value, may_act_for, parse_value, role_denied};
use crate::paging::{self, Page};
use crate::ranking::{rank_releases, usable_movie_releases};
use crate::render;
use crate::watcher::spawn_expiry_watcher;

pub const SERIES_NOT_CONFIGURED: &str = "Series service is not configured.";
pub const MOVIES_NOT_CONFIGURED: &str = "Movie service is not configured.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationStep {
    MediaSearch,
    SeasonSelect,
    EpisodeSelect,
    ReleaseSearch,
    ReleaseSelected,
}

/// Snapshot of one remediation wizard session
#[derive(Debug, Clone)]
pub struct RemediationSession {
    pub owner: OwnerKey,
    pub kind: MediaKind,
    pub listing_mode: ListingMode,
    pub query: String,
    pub results: Vec<Title>,
    pub page: usize,
    pub selected_media: Option<Title>,
    /// Episodes of the selected series, after the listing-mode filter
    pub missing_episodes: Vec<Episode>,
    pub season_episodes: Vec<Episode>,
    pub episode_page: usize,
    pub selected_episode: Option<Episode>,
    /// Ranked and capped
    pub releases: Vec<Release>,
    pub release_page: usize,
    pub selected_release: Option<Release>,
    pub step: RemediationStep,
    pub view: ViewRef,
}

impl RemediationSession {
    fn media_view(&self, page_size: usize) -> View {
        render::media_page(&self.results, &Page::new(self.page, self.results.len(), page_size))
    }

    fn episode_view(&self, page_size: usize) -> View {
        render::episode_page(
            &self.season_episodes,
            &Page::new(self.episode_page, self.season_episodes.len(), page_size),
        )
    }

    fn release_page(&self, page_size: usize) -> Page {
        Page::new(self.release_page, self.releases.len(), page_size)
    }

    fn release_view(&self, page_size: usize) -> View {
        render::release_list(&self.releases, &self.release_page(page_size), self.is_movie())
    }

    fn is_movie(&self) -> bool {
        self.kind == MediaKind::Movie
    }

    /// Text of the "No results" card for the current selection
    fn no_results_message(&self) -> String {
        let title = self
            .selected_media
            .as_ref()
            .map(|t| t.title.as_str())
            .unwrap_or_default();
        match (&self.kind, &self.selected_episode) {
            (MediaKind::Tv, Some(episode)) => {
                format!("No Downloads found for Media - {} - {}", title, episode.code())
            }
            (MediaKind::Tv, None) => format!("No Downloads found for Media - {} - Episode", title),
            (MediaKind::Movie, _) => format!("No files found for Media - {}", title),
        }
    }
}

/// Seasons in first-seen order
fn seasons_of(episodes: &[Episode]) -> Vec<u32> {
    let mut seasons = Vec::new();
    for episode in episodes {
        if !seasons.contains(&episode.season_number) {
            seasons.push(episode.season_number);
        }
    }
    seasons
}

pub struct RemediationWizard {
    settings: WizardSettings,
    series: Option<Arc<dyn AcquisitionClient>>,
    movies: Option<Arc<dyn AcquisitionClient>>,
    sink: Arc<dyn ViewSink>,
    store: Arc<SessionStore<RemediationSession>>,
}

impl RemediationWizard {
    pub fn new(
        settings: WizardSettings,
        series: Option<Arc<dyn AcquisitionClient>>,
        movies: Option<Arc<dyn AcquisitionClient>>,
        sink: Arc<dyn ViewSink>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(settings.session_ttl));
        Self {
            settings,
            series,
            movies,
            sink,
            store,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore<RemediationSession>> {
        &self.store
    }

    pub fn series_configured(&self) -> bool {
        self.series.is_some()
    }

    pub fn movies_configured(&self) -> bool {
        self.movies.is_some()
    }

    fn client(&self, kind: MediaKind) -> Option<&Arc<dyn AcquisitionClient>> {
        match kind {
            MediaKind::Tv => self.series.as_ref(),
            MediaKind::Movie => self.movies.as_ref(),
        }
    }

    fn page_size(&self) -> usize {
        self.settings.page_size
    }

    /// Start a session: list matching titles
    pub async fn invoke(
        &self,
        caller: &Caller,
        target: ViewRef,
        media_type: &str,
        query: &str,
        listing_mode: Option<&str>,
    ) -> Reply {
        if let Some(denied) = role_denied(&self.settings, caller) {
            return denied;
        }
        let Some(kind) = MediaKind::parse(media_type) else {
            return Reply::ephemeral("Media type must be `tv` or `movie`.");
        };
        let Some(listing_mode) = ListingMode::parse(listing_mode.unwrap_or_default()) else {
            return Reply::ephemeral("Listing mode must be `missing only` or `all files`.");
        };
        let Some(client) = self.client(kind) else {
            return Reply::ephemeral(match kind {
                MediaKind::Tv => SERIES_NOT_CONFIGURED,
                MediaKind::Movie => MOVIES_NOT_CONFIGURED,
            });
        };
        let query = query.trim();

        let fetched = match listing_mode {
            ListingMode::AllFiles => {
                with_deadline(self.settings.search_timeout, client.list_titles()).await
            }
            ListingMode::MissingOnly => {
                with_deadline(self.settings.search_timeout, client.list_missing()).await
            }
        };
        let titles = match fetched {
            Ok(titles) => titles,
            Err(e) => {
                warn!(owner = %caller.owner, kind = kind.as_str(), error = %e, "Title listing failed");
                let what = match (listing_mode, kind) {
                    (ListingMode::MissingOnly, _) => "missing",
                    (ListingMode::AllFiles, MediaKind::Movie) => "movies",
                    (ListingMode::AllFiles, MediaKind::Tv) => "series",
                };
                return Reply::render(View::notice(format!("Fetch {} failed: {}", what, e)));
            }
        };

        let needle = query.to_lowercase();
        let results: Vec<Title> = titles
            .into_iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .collect();
        if results.is_empty() {
            let message = match listing_mode {
                ListingMode::MissingOnly => format!("No missing results found for `{}`.", query),
                ListingMode::AllFiles => format!("No results found for `{}`.", query),
            };
            return Reply::render(View::notice(message));
        }

        let session = RemediationSession {
            owner: caller.owner.clone(),
            kind,
            listing_mode,
            query: query.to_string(),
            results,
            page: 0,
            selected_media: None,
            missing_episodes: Vec::new(),
            season_episodes: Vec::new(),
            episode_page: 0,
            selected_episode: None,
            releases: Vec::new(),
            release_page: 0,
            selected_release: None,
            step: RemediationStep::MediaSearch,
            view: target.clone(),
        };
        let view = session.media_view(self.page_size());
        let result_count = session.results.len();
        let session_id = self.store.set(caller.owner.clone(), session);
        info!(
            owner = %caller.owner,
            session = %session_id,
            kind = kind.as_str(),
            mode = listing_mode.as_str(),
            results = result_count,
            "Remediation session started"
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
    fn session_for(&self, caller: &Caller, target: &ViewRef) -> Option<RemediationSession> {
        let session = self.store.get(&caller.owner)?;
        if session.view != *target {
            debug!(owner = %caller.owner, view = %target, "Event from a foreign or stale view");
            return None;
        }
        self.store.touch(&caller.owner);
        Some(session)
    }

    pub fn page_media(&self, caller: &Caller, target: &ViewRef, forward: bool) -> Reply {
        let page_size = self.page_size();
        let view = self.store.update(&caller.owner, |s| {
            if s.view != *target || s.step != RemediationStep::MediaSearch {
                return None;
            }
            s.page = paging::step(s.page, forward, s.results.len(), page_size);
            Some(s.media_view(page_size))
        });
        match view.flatten() {
            Some(view) => Reply::render(view),
            None => Reply::Silent,
        }
    }

    pub fn page_episodes(&self, caller: &Caller, target: &ViewRef, forward: bool) -> Reply {
        let page_size = self.page_size();
        let view = self.store.update(&caller.owner, |s| {
            if s.view != *target || s.step != RemediationStep::EpisodeSelect {
                return None;
            }
            s.episode_page = paging::step(s.episode_page, forward, s.season_episodes.len(), page_size);
            Some(s.episode_view(page_size))
        });
        match view.flatten() {
            Some(view) => Reply::render(view),
            None => Reply::Silent,
        }
    }

    pub fn page_releases(&self, caller: &Caller, target: &ViewRef, forward: bool) -> Reply {
        let page_size = self.page_size();
        let view = self.store.update(&caller.owner, |s| {
            if s.view != *target || s.step != RemediationStep::ReleaseSearch {
                return None;
            }
            s.release_page = paging::step(s.release_page, forward, s.releases.len(), page_size);
            Some(s.release_view(page_size))
        });
        match view.flatten() {
            Some(view) => Reply::render(view),
            None => Reply::Silent,
        }
    }

    pub async fn select_media(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        let Some(session) = self.session_for(caller, target) else {
            return Ok(Reply::Silent);
        };
        let id: u64 = parse_value(ComponentId::RemedySelectMedia, values)?;

        let Some(title) = session.results.iter().find(|t| t.id == id).cloned() else {
            self.store.clear(&caller.owner);
            return Ok(Reply::render(View::closing_notice("Media not found.")));
        };
        let Some(client) = self.client(session.kind).cloned() else {
            return Ok(Reply::Silent);
        };
        debug!(owner = %caller.owner, media_id = id, title = %title.title, "Media selected");

        if session.is_movie() {
            let Some(session) = self.store.update(&caller.owner, |s| {
                s.selected_media = Some(title.clone());
                s.clone()
            }) else {
                return Ok(Reply::Silent);
            };
            return Ok(self
                .search_releases(caller, session, client, ReleaseScope::Movie(id))
                .await);
        }

        let episodes = match with_deadline(self.settings.search_timeout, client.list_episodes(id)).await {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!(owner = %caller.owner, series_id = id, error = %e, "Episode listing failed");
                return Ok(Reply::render(View::notice(format!("Fetch episodes failed: {}", e))));
            }
        };
        let episodes: Vec<Episode> = match session.listing_mode {
            ListingMode::MissingOnly => episodes.into_iter().filter(|e| !e.has_file).collect(),
            ListingMode::AllFiles => episodes,
        };
        let seasons = seasons_of(&episodes);

        let updated = self.store.update(&caller.owner, |s| {
            s.selected_media = Some(title);
            s.missing_episodes = episodes;
            s.step = RemediationStep::SeasonSelect;
        });
        if updated.is_none() {
            return Ok(Reply::Silent);
        }
        Ok(Reply::render(render::season_picker(&seasons)))
    }

    pub fn select_season(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        if self.session_for(caller, target).is_none() {
            return Ok(Reply::Silent);
        }
        let season: u32 = parse_value(ComponentId::RemedySelectSeason, values)?;
        let page_size = self.page_size();

        let view = self.store.update(&caller.owner, |s| {
            s.season_episodes = s
                .missing_episodes
                .iter()
                .filter(|e| e.season_number == season)
                .cloned()
                .collect();
            s.episode_page = 0;
            if s.season_episodes.is_empty() {
                return View::notice("No episodes found.");
            }
            s.step = RemediationStep::EpisodeSelect;
            s.episode_view(page_size)
        });
        debug!(owner = %caller.owner, season, "Season selected");
        Ok(view.map(Reply::render).unwrap_or(Reply::Silent))
    }

    pub async fn select_episode(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        let Some(session) = self.session_for(caller, target) else {
            return Ok(Reply::Silent);
        };
        let id: u64 = parse_value(ComponentId::RemedySelectEpisode, values)?;

        let Some(episode) = session.season_episodes.iter().find(|e| e.id == id).cloned() else {
            self.store.clear(&caller.owner);
            return Ok(Reply::render(View::closing_notice("Episode not found.")));
        };
        let Some(client) = self.client(session.kind).cloned() else {
            return Ok(Reply::Silent);
        };
        let Some(session) = self.store.update(&caller.owner, |s| {
            s.selected_episode = Some(episode);
            s.clone()
        }) else {
            return Ok(Reply::Silent);
        };
        debug!(owner = %caller.owner, episode_id = id, "Episode selected");

        Ok(self
            .search_releases(caller, session, client, ReleaseScope::Episode(id))
            .await)
    }

    /// Look up releases for the current selection under the release deadline
    async fn search_releases(
        &self,
        caller: &Caller,
        session: RemediationSession,
        client: Arc<dyn AcquisitionClient>,
        scope: ReleaseScope,
    ) -> Reply {
        if let Err(e) = self.sink.edit(&session.view, render::searching()).await {
            warn!(view = %session.view, error = %e, "Failed to show searching placeholder");
        }

        let result = with_deadline(self.settings.release_timeout, client.list_releases(scope)).await;
        let releases = match result {
            Ok(releases) if session.is_movie() => usable_movie_releases(releases),
            Ok(releases) => releases,
            Err(e) if e.is_timeout() => Vec::new(),
            Err(e) => {
                warn!(owner = %caller.owner, ?scope, error = %e, "Release lookup failed");
                let page_size = self.page_size();
                let view = self.store.update(&caller.owner, |s| {
                    if s.is_movie() {
                        s.step = RemediationStep::MediaSearch;
                        s.media_view(page_size)
                    } else {
                        s.step = RemediationStep::EpisodeSelect;
                        s.episode_view(page_size)
                    }
                });
                return match view {
                    Some(view) => Reply::render(view.with_content(format!("Fetch releases failed: {}", e))),
                    None => Reply::Silent,
                };
            }
        };

        if releases.is_empty() {
            if !self.store.clear(&caller.owner) {
                return Reply::Silent;
            }
            info!(owner = %caller.owner, ?scope, "No releases found");
            return Reply::render(render::no_results(session.no_results_message()));
        }

        let ranked = rank_releases(releases, self.settings.release_cap);
        let count = ranked.len();
        let page_size = self.page_size();
        let updated = self.store.update(&caller.owner, |s| {
            s.releases = ranked;
            s.release_page = 0;
            s.selected_release = None;
            s.step = RemediationStep::ReleaseSearch;
            s.release_view(page_size)
        });
        // aborted or expired while the lookup was running
        let Some(view) = updated else {
            return Reply::Silent;
        };
        debug!(owner = %caller.owner, ?scope, count, "Releases listed");
        Reply::render(view)
    }

    pub fn select_release(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        let Some(session) = self.session_for(caller, target) else {
            return Ok(Reply::Silent);
        };
        let guid = first_value(ComponentId::RemedySelectRelease, values)?;

        let Some(release) = session.releases.iter().find(|r| r.guid == guid).cloned() else {
            self.store.clear(&caller.owner);
            return Ok(Reply::render(View::closing_notice("Release not found.")));
        };
        let page = session.release_page(self.page_size());
        let view = render::release_info(&release, page.slice(&session.releases));
        self.store.update(&caller.owner, |s| {
            s.selected_release = Some(release);
            s.step = RemediationStep::ReleaseSelected;
        });
        Ok(Reply::render(view))
    }

    /// Back from the release detail to the release list
    pub fn change_release(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(session) = self.session_for(caller, target) else {
            return Reply::Silent;
        };
        if session.releases.is_empty() {
            return Reply::Silent;
        }
        let page_size = self.page_size();
        let view = self.store.update(&caller.owner, |s| {
            s.selected_release = None;
            s.step = RemediationStep::ReleaseSearch;
            s.release_view(page_size)
        });
        view.map(Reply::render).unwrap_or(Reply::Silent)
    }

    pub async fn approve(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(session) = self.session_for(caller, target) else {
            return Reply::Silent;
        };
        let Some(release) = session.selected_release else {
            self.store.clear(&caller.owner);
            return Reply::render(View::closing_notice("No release selected."));
        };
        let Some(client) = self.client(session.kind) else {
            return Reply::Silent;
        };

        match with_deadline(self.settings.release_timeout, client.submit_approval(&release)).await {
            Ok(()) => {
                self.store.clear(&caller.owner);
                info!(owner = %caller.owner, guid = %release.guid, "Release approved");
                Reply::render(render::download_started(release.display_title()))
            }
            Err(e) => {
                warn!(owner = %caller.owner, guid = %release.guid, error = %e, "Approval failed");
                Reply::render(View::notice(format!("Approve failed: {}", e)))
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
        info!(owner = %owner, by = %caller.owner, "Remediation session aborted");
        Reply::render(render::remediation_aborted())
    }
}

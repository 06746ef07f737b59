//! Routes protocol commands to the wizards

use haruki_api::{Caller, ComponentId, HealthStatus, Invocation, Reply, ViewRef};
use haruki_config::Settings;
use haruki_remote_api::{
    AcquisitionClient, ActivityClient, CatalogClient, IdentityLinker, ViewSink,
};
use haruki_util::{HarukiError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::activity::ActivityView;
use crate::link::LinkWizard;
use crate::notify::NotificationRelay;
use crate::remediation::RemediationWizard;
use crate::request::RequestWizard;
use crate::request_list::RequestListWizard;

const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(30);

/// External services the daemon was able to build. Absent ones make the
/// matching commands answer "not configured".
pub struct Collaborators {
    pub catalog: Option<Arc<dyn CatalogClient>>,
    pub identity: Option<Arc<dyn IdentityLinker>>,
    pub series: Option<Arc<dyn AcquisitionClient>>,
    pub movies: Option<Arc<dyn AcquisitionClient>>,
    pub activity: Option<Arc<dyn ActivityClient>>,
    pub sink: Arc<dyn ViewSink>,
}

pub struct Dispatcher {
    request: RequestWizard,
    remediation: RemediationWizard,
    request_list: RequestListWizard,
    link: LinkWizard,
    activity: ActivityView,
    relay: Arc<NotificationRelay>,
    webhook_enabled: bool,
}

impl Dispatcher {
    pub fn new(settings: &Settings, collaborators: Collaborators) -> Self {
        let Collaborators {
            catalog,
            identity,
            series,
            movies,
            activity,
            sink,
        } = collaborators;

        let dedup_window = settings
            .webhook
            .as_ref()
            .map(|w| w.dedup_window)
            .unwrap_or(DEFAULT_DEDUP_WINDOW);
        let relay = Arc::new(NotificationRelay::new(
            dedup_window,
            settings.default_channel.clone(),
            catalog.clone(),
            identity.clone(),
            sink.clone(),
        )
        .with_lookup_timeout(settings.wizard.search_timeout));

        let wizard = &settings.wizard;
        Self {
            request_list: RequestListWizard::new(
                wizard.clone(),
                catalog.clone(),
                identity.clone(),
                sink.clone(),
            ),
            link: LinkWizard::new(wizard.clone(), catalog.clone(), sink.clone()),
            activity: ActivityView::new(wizard.clone(), activity),
            request: RequestWizard::new(wizard.clone(), catalog, identity, sink.clone()),
            remediation: RemediationWizard::new(wizard.clone(), series, movies, sink),
            relay,
            webhook_enabled: settings.webhook.is_some(),
        }
    }

    pub fn request(&self) -> &RequestWizard {
        &self.request
    }

    pub fn remediation(&self) -> &RemediationWizard {
        &self.remediation
    }

    pub fn request_list(&self) -> &RequestListWizard {
        &self.request_list
    }

    pub fn link(&self) -> &LinkWizard {
        &self.link
    }

    pub fn relay(&self) -> &Arc<NotificationRelay> {
        &self.relay
    }

    pub async fn invoke(&self, caller: &Caller, target: ViewRef, invocation: Invocation) -> Reply {
        match invocation {
            Invocation::Request { media_type, query } => {
                self.request.invoke(caller, target, &media_type, &query).await
            }
            Invocation::Remediation {
                media_type,
                query,
                listing_mode,
            } => {
                self.remediation
                    .invoke(caller, target, &media_type, &query, listing_mode.as_deref())
                    .await
            }
            Invocation::RequestList {
                user,
                include_finished,
            } => {
                self.request_list
                    .invoke(caller, target, user.as_deref(), include_finished)
                    .await
            }
            Invocation::Link { user } => self.link.invoke(caller, target, user.as_deref()).await,
            Invocation::Activity => self.activity.invoke(caller).await,
        }
    }

    /// Handle a control event. Errors are protocol faults only.
    pub async fn component(
        &self,
        caller: &Caller,
        target: &ViewRef,
        component_id: &str,
        values: &[String],
    ) -> Result<Reply> {
        let id: ComponentId = component_id
            .parse()
            .map_err(HarukiError::unknown_component)?;
        debug!(owner = %caller.owner, view = %target, component = id.as_str(), "Component event");

        let request = &self.request;
        let remediation = &self.remediation;
        let reply = match id {
            ComponentId::RequestSelect => request.select(caller, target, values).await?,
            ComponentId::RequestConfirm => request.confirm(caller, target).await,
            ComponentId::RequestNotify => request.notify(caller, target).await,
            ComponentId::RequestAbort => request.abort(caller, target),
            ComponentId::RemedySelectMedia => remediation.select_media(caller, target, values).await?,
            ComponentId::RemedyMediaNext => remediation.page_media(caller, target, true),
            ComponentId::RemedyMediaPrev => remediation.page_media(caller, target, false),
            ComponentId::RemedySelectSeason => remediation.select_season(caller, target, values)?,
            ComponentId::RemedySelectEpisode => {
                remediation.select_episode(caller, target, values).await?
            }
            ComponentId::RemedyEpisodeNext => remediation.page_episodes(caller, target, true),
            ComponentId::RemedyEpisodePrev => remediation.page_episodes(caller, target, false),
            ComponentId::RemedySelectRelease => remediation.select_release(caller, target, values)?,
            ComponentId::RemedyReleaseNext => remediation.page_releases(caller, target, true),
            ComponentId::RemedyReleasePrev => remediation.page_releases(caller, target, false),
            ComponentId::RemedyChangeRelease => remediation.change_release(caller, target),
            ComponentId::RemedyApprove => remediation.approve(caller, target).await,
            ComponentId::RemedyAbort => remediation.abort(caller, target),
            ComponentId::RequestListNext => self.request_list.page(caller, target, true),
            ComponentId::RequestListPrev => self.request_list.page(caller, target, false),
            ComponentId::RequestListAbort => self.request_list.abort(caller, target),
            ComponentId::LinkSelect => self.link.select(caller, target, values).await?,
            ComponentId::LinkNext => self.link.page(caller, target, true),
            ComponentId::LinkPrev => self.link.page(caller, target, false),
            ComponentId::LinkAbort => self.link.abort(caller, target),
        };
        Ok(reply)
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            live: true,
            catalog_configured: self.request.is_configured(),
            series_configured: self.remediation.series_configured(),
            movies_configured: self.remediation.movies_configured(),
            webhook_enabled: self.webhook_enabled,
            request_sessions: self.request.store().live_count(),
            remediation_sessions: self.remediation.store().live_count(),
            activity_configured: self.activity.is_configured(),
            request_list_sessions: self.request_list.store().live_count(),
            link_sessions: self.link.store().live_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haruki_remote_api::MockViewSink;

    fn bare() -> Dispatcher {
        Dispatcher::new(
            &Settings::default(),
            Collaborators {
                catalog: None,
                identity: None,
                series: None,
                movies: None,
                activity: None,
                sink: Arc::new(MockViewSink::new()),
            },
        )
    }

    #[tokio::test]
    async fn unknown_component_is_a_protocol_error() {
        let d = bare();
        let err = d
            .component(&Caller::new("u1", "ann"), &ViewRef::new("c", "m"), "request.explode", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, HarukiError::UnknownComponent(id) if id == "request.explode"));
    }

    #[tokio::test]
    async fn events_without_session_are_silent() {
        let d = bare();
        let reply = d
            .component(&Caller::new("u1", "ann"), &ViewRef::new("c", "m"), "remedy.approve", &[])
            .await
            .unwrap();
        assert!(reply.is_silent());
    }

    #[tokio::test]
    async fn invocation_without_collaborators() {
        let d = bare();
        let reply = d
            .invoke(
                &Caller::new("u1", "ann"),
                ViewRef::new("c", "m"),
                Invocation::Remediation {
                    media_type: "tv".into(),
                    query: "lost".into(),
                    listing_mode: None,
                },
            )
            .await;
        assert_eq!(reply, Reply::ephemeral("Series service is not configured."));
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let health = bare().health();
        assert!(health.live);
        assert!(!health.catalog_configured);
        assert!(!health.series_configured);
        assert!(!health.webhook_enabled);
        assert!(!health.activity_configured);
        assert_eq!(health.request_sessions, 0);
        assert_eq!(health.link_sessions, 0);
    }

    #[tokio::test]
    async fn new_commands_without_collaborators() {
        let d = bare();
        let caller = Caller::new("u1", "ann");
        let target = ViewRef::new("c", "m");

        let reply = d.invoke(&caller, target.clone(), Invocation::Activity).await;
        assert_eq!(reply, Reply::ephemeral("Activity service is not configured."));
        let reply = d
            .invoke(&caller, target.clone(), Invocation::Link { user: None })
            .await;
        assert_eq!(reply, Reply::ephemeral("Catalog service is not configured."));
        let reply = d
            .invoke(
                &caller,
                target.clone(),
                Invocation::RequestList { user: None, include_finished: false },
            )
            .await;
        assert_eq!(reply, Reply::ephemeral("Catalog service is not configured."));

        for id in ["requests.next", "requests.abort", "link.prev", "link.abort"] {
            assert!(d.component(&caller, &target, id, &[]).await.unwrap().is_silent());
        }
    }
}

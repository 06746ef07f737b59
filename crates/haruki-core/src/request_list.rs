//! Request list: page through the requests a catalog user made

use haruki_api::{Caller, Reply, UserId, UserRequest, View, ViewRef};
use haruki_config::WizardSettings;
use haruki_remote_api::{with_deadline, CatalogClient, IdentityLinker, ViewSink};
use haruki_store::SessionStore;
use haruki_util::OwnerKey;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{may_act_for, role_denied};
use crate::paging::{self, Page};
use crate::render;
use crate::request::CATALOG_NOT_CONFIGURED;
use crate::watcher::spawn_expiry_watcher;

/// Requests shown per page
pub const REQUEST_LIST_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct RequestListSession {
    pub owner: OwnerKey,
    /// Whose requests are listed
    pub name: String,
    pub user: UserId,
    pub requests: Vec<UserRequest>,
    pub page: usize,
    pub view: ViewRef,
}

impl RequestListSession {
    fn page(&self) -> Page {
        Page::new(self.page, self.requests.len(), REQUEST_LIST_PAGE_SIZE)
    }

    fn render(&self) -> View {
        render::request_list_page(&self.name, &self.requests, &self.page())
    }
}

pub struct RequestListWizard {
    settings: WizardSettings,
    catalog: Option<Arc<dyn CatalogClient>>,
    identity: Option<Arc<dyn IdentityLinker>>,
    sink: Arc<dyn ViewSink>,
    store: Arc<SessionStore<RequestListSession>>,
}

impl RequestListWizard {
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

    pub fn store(&self) -> &Arc<SessionStore<RequestListSession>> {
        &self.store
    }

    /// List the requests of `user`, or of the caller when absent
    pub async fn invoke(
        &self,
        caller: &Caller,
        target: ViewRef,
        user: Option<&str>,
        include_finished: bool,
    ) -> Reply {
        if let Some(denied) = role_denied(&self.settings, caller) {
            return denied;
        }
        let (Some(catalog), Some(identity)) = (&self.catalog, &self.identity) else {
            return Reply::ephemeral(CATALOG_NOT_CONFIGURED);
        };

        let subject = match user.map(str::trim).filter(|u| !u.is_empty()) {
            Some(user) => OwnerKey::new(user),
            None => caller.owner.clone(),
        };
        let timeout = self.settings.search_timeout;

        let user = match with_deadline(timeout, identity.resolve_external_identity(&subject)).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Reply::ephemeral(format!("User {} is not linked to the catalog.", subject));
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Identity lookup failed");
                return Reply::ephemeral(format!("Error resolving user: {}", e));
            }
        };

        let requests =
            match with_deadline(timeout, catalog.user_requests(user, include_finished)).await {
                Ok(requests) => requests,
                Err(e) => {
                    warn!(user = %user, error = %e, "Request listing failed");
                    return Reply::ephemeral(format!("Error fetching requests: {}", e));
                }
            };

        let name = if subject == caller.owner {
            caller.name().to_string()
        } else {
            match with_deadline(timeout, catalog.user(user)).await {
                Ok(profile) => profile.label(),
                Err(_) => subject.to_string(),
            }
        };

        let session = RequestListSession {
            owner: caller.owner.clone(),
            name,
            user,
            requests,
            page: 0,
            view: target.clone(),
        };
        let view = session.render();
        let count = session.requests.len();
        let session_id = self.store.set(caller.owner.clone(), session);
        info!(
            owner = %caller.owner,
            session = %session_id,
            user = %user,
            count,
            include_finished,
            "Request list started"
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

    /// Move one page; silent outside the caller's own list
    pub fn page(&self, caller: &Caller, target: &ViewRef, forward: bool) -> Reply {
        let view = self.store.update(&caller.owner, |s| {
            if s.view != *target {
                return None;
            }
            s.page = paging::step(s.page, forward, s.requests.len(), REQUEST_LIST_PAGE_SIZE);
            Some(s.render())
        });
        match view.flatten() {
            Some(view) => Reply::render(view),
            None => {
                debug!(owner = %caller.owner, view = %target, "Page event without a list");
                Reply::Silent
            }
        }
    }

    /// Close the list shown in `target`; owner or privileged callers only
    pub fn abort(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(owner) = self.store.find_owner(|s| s.view == *target) else {
            return Reply::Silent;
        };
        if !may_act_for(&self.settings, caller, &owner) {
            return Reply::Silent;
        }
        self.store.clear(&owner);
        info!(owner = %owner, by = %caller.owner, "Request list aborted");
        Reply::render(render::request_list_aborted())
    }
}

//! Catalog link wizard: attach a chat identity to a catalog user
//!
//! Privileged callers may link anyone and see every catalog user. Everyone
//! else may only link themselves, to a user nobody has linked yet.

use haruki_api::{Caller, CatalogUser, ComponentId, Reply, UserId, View, ViewRef};
use haruki_config::WizardSettings;
use haruki_remote_api::{with_deadline, CatalogClient, ViewSink};
use haruki_store::SessionStore;
use haruki_util::{OwnerKey, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::access::{is_privileged, may_act_for, parse_value, role_denied};
use crate::paging::{self, Page};
use crate::render;
use crate::request::CATALOG_NOT_CONFIGURED;
use crate::watcher::spawn_expiry_watcher;

pub const LINK_SESSION_TTL: Duration = Duration::from_secs(5 * 60);
pub const LINK_PAGE_SIZE: usize = 25;

/// Deadline for walking the catalog's user list
const USER_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for storing the link
const LINK_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct LinkSession {
    pub owner: OwnerKey,
    /// Identity being linked
    pub subject: OwnerKey,
    pub privileged: bool,
    pub candidates: Vec<CatalogUser>,
    pub page: usize,
    pub view: ViewRef,
}

impl LinkSession {
    fn render(&self) -> View {
        let page = Page::new(self.page, self.candidates.len(), LINK_PAGE_SIZE);
        render::link_page(self.subject.as_str(), &self.candidates, &page, self.privileged)
    }
}

pub struct LinkWizard {
    settings: WizardSettings,
    catalog: Option<Arc<dyn CatalogClient>>,
    sink: Arc<dyn ViewSink>,
    store: Arc<SessionStore<LinkSession>>,
}

impl LinkWizard {
    pub fn new(
        settings: WizardSettings,
        catalog: Option<Arc<dyn CatalogClient>>,
        sink: Arc<dyn ViewSink>,
    ) -> Self {
        Self {
            settings,
            catalog,
            sink,
            store: Arc::new(SessionStore::new(LINK_SESSION_TTL)),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore<LinkSession>> {
        &self.store
    }

    pub async fn invoke(&self, caller: &Caller, target: ViewRef, user: Option<&str>) -> Reply {
        if let Some(denied) = role_denied(&self.settings, caller) {
            return denied;
        }
        let Some(catalog) = &self.catalog else {
            return Reply::ephemeral(CATALOG_NOT_CONFIGURED);
        };

        let privileged = is_privileged(&self.settings, caller);
        let subject = match user.map(str::trim).filter(|u| !u.is_empty()) {
            Some(user) => OwnerKey::new(user),
            None => caller.owner.clone(),
        };
        if subject != caller.owner && !privileged {
            return Reply::ephemeral("You can only link your own ID.");
        }

        let mut candidates = match with_deadline(USER_LOAD_TIMEOUT, catalog.list_users()).await {
            Ok(users) => users,
            Err(e) => {
                warn!(owner = %caller.owner, error = %e, "Catalog user listing failed");
                return Reply::render(View::notice(format!("Failed to load catalog users: {}", e)));
            }
        };
        if !privileged {
            candidates.retain(|u| !u.is_linked());
        }
        if candidates.is_empty() {
            let message = if privileged {
                "No catalog users found."
            } else {
                "No catalog users without a linked ID were found."
            };
            return Reply::render(View::notice(message));
        }

        let session = LinkSession {
            owner: caller.owner.clone(),
            subject: subject.clone(),
            privileged,
            candidates,
            page: 0,
            view: target.clone(),
        };
        let view = session.render();
        let session_id = self.store.set(caller.owner.clone(), session);
        info!(
            owner = %caller.owner,
            session = %session_id,
            subject = %subject,
            privileged,
            "Link session started"
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

    pub fn page(&self, caller: &Caller, target: &ViewRef, forward: bool) -> Reply {
        let view = self.store.update(&caller.owner, |s| {
            if s.view != *target {
                return None;
            }
            s.page = paging::step(s.page, forward, s.candidates.len(), LINK_PAGE_SIZE);
            Some(s.render())
        });
        view.flatten().map(Reply::render).unwrap_or(Reply::Silent)
    }

    /// A catalog user was picked; store the link and end the session
    pub async fn select(&self, caller: &Caller, target: &ViewRef, values: &[String]) -> Result<Reply> {
        let Some(session) = self.store.get(&caller.owner).filter(|s| s.view == *target) else {
            debug!(owner = %caller.owner, view = %target, "Link selection without a session");
            return Ok(Reply::Silent);
        };
        let id: u64 = parse_value(ComponentId::LinkSelect, values)?;
        let user = UserId(id);
        if !session.candidates.iter().any(|u| u.id == user) {
            self.store.clear(&caller.owner);
            return Ok(Reply::render(View::closing_notice("User not found.")));
        }
        let Some(catalog) = &self.catalog else {
            return Ok(Reply::Silent);
        };

        let outcome =
            with_deadline(LINK_TIMEOUT, catalog.link_external_identity(user, &session.subject)).await;
        self.store.clear(&caller.owner);
        match outcome {
            Ok(()) => {
                info!(owner = %caller.owner, subject = %session.subject, user = %user, "Identity linked");
                Ok(Reply::render(render::linked(session.subject.as_str(), user)))
            }
            Err(e) => {
                warn!(subject = %session.subject, user = %user, error = %e, "Link failed");
                Ok(Reply::render(render::link_failed(&e.to_string())))
            }
        }
    }

    pub fn abort(&self, caller: &Caller, target: &ViewRef) -> Reply {
        let Some(owner) = self.store.find_owner(|s| s.view == *target) else {
            return Reply::Silent;
        };
        if !may_act_for(&self.settings, caller, &owner) {
            return Reply::Silent;
        }
        self.store.clear(&owner);
        info!(owner = %owner, by = %caller.owner, "Link session aborted");
        Reply::render(render::link_aborted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haruki_remote_api::{MockCatalog, MockViewSink};

    fn user(id: u64, name: &str, linked: Option<&str>) -> CatalogUser {
        CatalogUser {
            id: UserId(id),
            display_name: name.into(),
            email: format!("{}@example.com", name),
            external_id: linked.map(str::to_string),
        }
    }

    struct Fixture {
        wizard: LinkWizard,
        catalog: Arc<MockCatalog>,
        sink: Arc<MockViewSink>,
        target: ViewRef,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(
            MockCatalog::new()
                .with_user(user(1, "ann", None))
                .with_user(user(2, "bob", Some("42")))
                .with_user(user(3, "cy", None)),
        );
        let sink = Arc::new(MockViewSink::new());
        let settings = WizardSettings {
            privileged_role: Some("admin".into()),
            ..WizardSettings::default()
        };
        Fixture {
            wizard: LinkWizard::new(settings, Some(catalog.clone()), sink.clone()),
            catalog,
            sink,
            target: ViewRef::new("c1", "m1"),
        }
    }

    fn option_values(reply: &Reply) -> Vec<String> {
        reply
            .view()
            .and_then(|v| v.select_options(ComponentId::LinkSelect))
            .map(|opts| opts.iter().map(|o| o.value.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn members_link_themselves_to_unlinked_users() {
        let f = fixture();
        let caller = Caller::new("777", "dee");

        let reply = f.wizard.invoke(&caller, f.target.clone(), None).await;
        assert_eq!(option_values(&reply), vec!["1", "3"]);

        let reply = f
            .wizard
            .select(&caller, &f.target, &["3".to_string()])
            .await
            .unwrap();
        let card = reply.view().unwrap().first_card().unwrap().clone();
        assert_eq!(card.title, "Linked ✅");
        assert!(card.description.starts_with("Assigned ID `777` to catalog user ID `3`."));
        assert_eq!(f.catalog.linked(), vec![(UserId(3), OwnerKey::new("777"))]);
        assert_eq!(f.wizard.store().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn members_cannot_link_others() {
        let f = fixture();
        let reply = f
            .wizard
            .invoke(&Caller::new("777", "dee"), f.target.clone(), Some("888"))
            .await;
        assert_eq!(reply, Reply::ephemeral("You can only link your own ID."));
        assert_eq!(f.wizard.store().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn admins_see_everyone_and_link_others() {
        let f = fixture();
        let admin = Caller::new("900", "root").with_role("admin");

        let reply = f.wizard.invoke(&admin, f.target.clone(), Some("888")).await;
        assert_eq!(option_values(&reply), vec!["1", "2", "3"]);

        f.wizard
            .select(&admin, &f.target, &["2".to_string()])
            .await
            .unwrap();
        assert_eq!(f.catalog.linked(), vec![(UserId(2), OwnerKey::new("888"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_left_to_link() {
        let f = fixture();
        f.catalog.users.lock().unwrap().retain(|id, _| *id == UserId(2));
        let reply = f.wizard.invoke(&Caller::new("777", "dee"), f.target.clone(), None).await;
        assert_eq!(
            reply.view().unwrap().content.as_deref(),
            Some("No catalog users without a linked ID were found.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_pick_and_failed_link_end_the_session() {
        let f = fixture();
        let caller = Caller::new("777", "dee");

        f.wizard.invoke(&caller, f.target.clone(), None).await;
        let reply = f
            .wizard
            .select(&caller, &f.target, &["2".to_string()])
            .await
            .unwrap();
        assert_eq!(reply.view().unwrap().content.as_deref(), Some("User not found."));
        assert_eq!(f.wizard.store().live_count(), 0);

        f.wizard.invoke(&caller, f.target.clone(), None).await;
        *f.catalog.fail_users.lock().unwrap() = true;
        let reply = f
            .wizard
            .select(&caller, &f.target, &["1".to_string()])
            .await
            .unwrap();
        let card = reply.view().unwrap().first_card().unwrap().clone();
        assert_eq!(card.title, "Link failed");
        assert!(reply.view().unwrap().clears_controls());
        assert!(f.catalog.linked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_is_reported() {
        let f = fixture();
        *f.catalog.fail_users.lock().unwrap() = true;
        let reply = f.wizard.invoke(&Caller::new("777", "dee"), f.target.clone(), None).await;
        let content = reply.view().unwrap().content.clone().unwrap();
        assert!(content.starts_with("Failed to load catalog users:"));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_and_expiry() {
        let f = fixture();
        let caller = Caller::new("777", "dee");

        f.wizard.invoke(&caller, f.target.clone(), None).await;
        assert!(f.wizard.abort(&Caller::new("555", "eve"), &f.target).is_silent());
        let reply = f.wizard.abort(&caller, &f.target);
        assert_eq!(reply.view().unwrap().first_card().unwrap().description, "Link session aborted.");

        let other = ViewRef::new("c1", "m2");
        f.wizard.invoke(&caller, other.clone(), None).await;
        tokio::time::sleep(LINK_SESSION_TTL + Duration::from_secs(1)).await;
        let edits = f.sink.edits_for(&other);
        assert_eq!(edits.len(), 1);
        assert_eq!(
            edits[0].first_card().unwrap().description,
            "Session timed out after 5 minutes of inactivity."
        );
    }
}

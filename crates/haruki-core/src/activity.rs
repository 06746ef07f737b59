//! Activity view: one card per stream the media server is playing

use haruki_api::{Caller, Reply, View};
use haruki_config::WizardSettings;
use haruki_remote_api::{with_deadline, ActivityClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::access::role_denied;
use crate::render;

pub const ACTIVITY_NOT_CONFIGURED: &str = "Activity service is not configured.";

const ACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Stateless: every invocation fetches afresh
pub struct ActivityView {
    settings: WizardSettings,
    client: Option<Arc<dyn ActivityClient>>,
}

impl ActivityView {
    pub fn new(settings: WizardSettings, client: Option<Arc<dyn ActivityClient>>) -> Self {
        Self { settings, client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn invoke(&self, caller: &Caller) -> Reply {
        if let Some(denied) = role_denied(&self.settings, caller) {
            return denied;
        }
        let Some(client) = &self.client else {
            return Reply::ephemeral(ACTIVITY_NOT_CONFIGURED);
        };

        match with_deadline(ACTIVITY_TIMEOUT, client.current_activity()).await {
            Ok(sessions) if sessions.is_empty() => {
                Reply::render(View::notice("No active sessions right now."))
            }
            Ok(sessions) => {
                debug!(owner = %caller.owner, streams = sessions.len(), "Activity shown");
                Reply::render(render::activity(&sessions))
            }
            Err(e) => {
                warn!(error = %e, "Activity lookup failed");
                Reply::render(View::notice(format!("Failed to fetch activity: {}", e)))
            }
        }
    }
}

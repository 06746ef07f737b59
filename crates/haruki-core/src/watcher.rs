//! Expiry watcher
//!
//! One task per freshly created session. It sleeps until the session's
//! deadline, re-checks (a refresh may have moved the deadline), and when the
//! session has really expired it pushes the timeout notice exactly once.

use haruki_api::ViewRef;
use haruki_remote_api::ViewSink;
use haruki_store::{ExpiryPoll, SessionStore};
use haruki_util::{OwnerKey, SessionId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::render;

/// Watch one session incarnation until it expires, is cleared or replaced.
pub fn spawn_expiry_watcher<T>(
    store: Arc<SessionStore<T>>,
    owner: OwnerKey,
    session_id: SessionId,
    target: ViewRef,
    sink: Arc<dyn ViewSink>,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match store.poll_expiry(&owner, &session_id) {
                ExpiryPoll::Live(deadline) => {
                    tokio::time::sleep_until(deadline.as_instant()).await;
                }
                ExpiryPoll::Expired => {
                    info!(owner = %owner, session = %session_id, view = %target, "Session expired");
                    let notice = render::timeout_notice(store.ttl());
                    if let Err(e) = sink.edit(&target, notice).await {
                        warn!(owner = %owner, view = %target, error = %e, "Failed to post expiry notice");
                    }
                    return;
                }
                ExpiryPoll::Gone => {
                    debug!(owner = %owner, session = %session_id, "Session ended before expiry");
                    return;
                }
            }
        }
    })
}

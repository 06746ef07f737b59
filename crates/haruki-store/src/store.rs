//! In-memory session store

use haruki_util::{MonotonicInstant, OwnerKey, SessionId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::{ExpiryPoll, Session};

/// Owner-keyed sessions with a sliding deadline.
///
/// Every operation serializes through one lock. The store keeps its own map
/// consistent, nothing more: a caller doing `get`, mutating the copy, then
/// `set` is not atomic against a concurrent `clear` or expiry. Wizards rely on
/// the transport delivering one interaction per owner at a time, or use
/// [`SessionStore::update`], which is.
#[derive(Debug)]
pub struct SessionStore<T> {
    ttl: Duration,
    sessions: Mutex<HashMap<OwnerKey, Session<T>>>,
}

impl<T: Clone> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<OwnerKey, Session<T>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace the owner's session with a fresh deadline
    pub fn set(&self, owner: OwnerKey, payload: T) -> SessionId {
        let session = Session::new(owner.clone(), payload, MonotonicInstant::now(), self.ttl);
        let id = session.id.clone();
        if let Some(previous) = self.sessions().insert(owner.clone(), session) {
            debug!(owner = %owner, replaced = %previous.id, "Replacing existing session");
        }
        id
    }

    /// Payload of a live session. Past-deadline sessions read as absent but
    /// are left in place for the expiry report.
    pub fn get(&self, owner: &OwnerKey) -> Option<T> {
        let now = MonotonicInstant::now();
        self.sessions()
            .get(owner)
            .filter(|s| s.is_live(now))
            .map(|s| s.payload.clone())
    }

    /// Like `get`, but also tells whether the session expired just now.
    ///
    /// A past-deadline session is removed and reported as `(None, true)`
    /// exactly once; afterwards, and for keys that never existed or were
    /// cleared, the answer is `(None, false)`.
    pub fn get_with_expiration(&self, owner: &OwnerKey) -> (Option<T>, bool) {
        let now = MonotonicInstant::now();
        let mut sessions = self.sessions();
        match sessions.get(owner) {
            None => (None, false),
            Some(s) if s.is_live(now) => (Some(s.payload.clone()), false),
            Some(_) => {
                sessions.remove(owner);
                (None, true)
            }
        }
    }

    /// Extend a live session's deadline to `now + ttl`.
    ///
    /// Returns false (and changes nothing) if there is no live session.
    pub fn touch(&self, owner: &OwnerKey) -> bool {
        let now = MonotonicInstant::now();
        match self.sessions().get_mut(owner) {
            Some(s) if s.is_live(now) => {
                s.extend(now, self.ttl);
                true
            }
            _ => false,
        }
    }

    /// Remove the owner's session unconditionally
    pub fn clear(&self, owner: &OwnerKey) -> bool {
        self.sessions().remove(owner).is_some()
    }

    /// Mutate a live payload in place and refresh its deadline, atomically.
    ///
    /// Absent or expired sessions are not touched and `None` is returned.
    pub fn update<R>(&self, owner: &OwnerKey, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let now = MonotonicInstant::now();
        let mut sessions = self.sessions();
        let session = sessions.get_mut(owner).filter(|s| s.is_live(now))?;
        let result = f(&mut session.payload);
        session.extend(now, self.ttl);
        Some(result)
    }

    /// Deadline of a live session
    pub fn deadline(&self, owner: &OwnerKey) -> Option<MonotonicInstant> {
        let now = MonotonicInstant::now();
        self.sessions()
            .get(owner)
            .filter(|s| s.is_live(now))
            .map(|s| s.expires_at)
    }

    /// Id of the owner's live session
    pub fn session_id(&self, owner: &OwnerKey) -> Option<SessionId> {
        let now = MonotonicInstant::now();
        self.sessions()
            .get(owner)
            .filter(|s| s.is_live(now))
            .map(|s| s.id.clone())
    }

    /// Check on one specific session incarnation.
    ///
    /// `Expired` removes the session, so it is reported once. A session that
    /// was replaced by a newer one under the same owner reads as `Gone`.
    pub fn poll_expiry(&self, owner: &OwnerKey, id: &SessionId) -> ExpiryPoll {
        let now = MonotonicInstant::now();
        let mut sessions = self.sessions();
        match sessions.get(owner) {
            Some(s) if &s.id != id => ExpiryPoll::Gone,
            Some(s) if s.is_live(now) => ExpiryPoll::Live(s.expires_at),
            Some(_) => {
                sessions.remove(owner);
                ExpiryPoll::Expired
            }
            None => ExpiryPoll::Gone,
        }
    }

    /// Owner of the first live session whose payload matches
    pub fn find_owner(&self, predicate: impl Fn(&T) -> bool) -> Option<OwnerKey> {
        let now = MonotonicInstant::now();
        self.sessions()
            .values()
            .find(|s| s.is_live(now) && predicate(&s.payload))
            .map(|s| s.owner.clone())
    }

    /// Number of live sessions
    pub fn live_count(&self) -> usize {
        let now = MonotonicInstant::now();
        self.sessions().values().filter(|s| s.is_live(now)).count()
    }
}

//! Session records held by the store

use haruki_util::{MonotonicInstant, OwnerKey, SessionId};
use std::time::Duration;

/// One live wizard session
#[derive(Debug, Clone)]
pub struct Session<T> {
    /// Identity of this incarnation
    pub id: SessionId,
    pub owner: OwnerKey,
    /// Wizard-specific state snapshot
    pub payload: T,
    pub created_at: MonotonicInstant,
    /// Only ever moves forward
    pub expires_at: MonotonicInstant,
}

impl<T> Session<T> {
    pub fn new(owner: OwnerKey, payload: T, now: MonotonicInstant, ttl: Duration) -> Self {
        Self {
            id: SessionId::new(),
            owner,
            payload,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Live iff `now < expires_at`
    pub fn is_live(&self, now: MonotonicInstant) -> bool {
        now < self.expires_at
    }

    pub fn time_remaining(&self, now: MonotonicInstant) -> Duration {
        self.expires_at.saturating_duration_until(now)
    }

    /// Push the deadline to `now + ttl`, never pulling it in
    pub fn extend(&mut self, now: MonotonicInstant, ttl: Duration) {
        let candidate = now + ttl;
        if candidate > self.expires_at {
            self.expires_at = candidate;
        }
    }
}

/// What an expiry watcher learns when it checks on its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPoll {
    /// Still live; sleep until this deadline and check again
    Live(MonotonicInstant),
    /// Just expired; the session has been removed and this is reported once
    Expired,
    /// Cleared or replaced by a newer session
    Gone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_boundary_is_exclusive() {
        let now = MonotonicInstant::now();
        let session = Session::new(OwnerKey::new("u1"), (), now, Duration::from_secs(180));

        assert!(session.is_live(now));
        assert!(session.is_live(now + Duration::from_secs(179)));
        assert!(!session.is_live(now + Duration::from_secs(180)));
        assert_eq!(session.time_remaining(now), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn extend_never_shortens() {
        let now = MonotonicInstant::now();
        let mut session = Session::new(OwnerKey::new("u1"), (), now, Duration::from_secs(180));
        let original = session.expires_at;

        session.extend(now, Duration::from_secs(60));
        assert_eq!(session.expires_at, original);

        session.extend(now + Duration::from_secs(10), Duration::from_secs(180));
        assert_eq!(session.expires_at, now + Duration::from_secs(190));
    }
}

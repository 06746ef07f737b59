//! Fixed-window suppression of duplicate inbound notifications

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::MonotonicInstant;

/// Suppresses repeats of the same notification key inside a fixed window.
///
/// The gate keeps its own lock, independent of any session store.
#[derive(Debug)]
pub struct DedupGate {
    /// How long a key stays "recently seen"
    window: Duration,
    /// Last time each key was let through
    seen: Mutex<HashMap<String, MonotonicInstant>>,
}

impl DedupGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check a key against the window using the current time.
    ///
    /// Returns `true` if the event should be suppressed.
    pub fn should_suppress(&self, key: &str) -> bool {
        self.should_suppress_at(key, MonotonicInstant::now())
    }

    /// Check a key against the window at an explicit instant.
    ///
    /// A key last seen less than `window` ago is suppressed and its timestamp
    /// is left alone. Otherwise the key is recorded at `now` and passes.
    pub fn should_suppress_at(&self, key: &str, now: MonotonicInstant) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = seen.get(key) {
            let age = now.duration_since(*last);
            if age < self.window {
                debug!(key, age_ms = age.as_millis() as u64, "Suppressing duplicate notification");
                return true;
            }
        }

        seen.insert(key.to_string(), now);
        false
    }

    /// Drop keys older than the window so the map does not grow unbounded
    pub fn cleanup(&self) {
        let now = MonotonicInstant::now();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, last| now.duration_since(*last) < self.window);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

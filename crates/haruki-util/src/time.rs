//! Time utilities for harukid
//!
//! Session deadlines are kept on a monotonic clock so wall-clock jumps
//! never shorten or extend a session. The clock is tokio's, which means
//! paused-time tests drive deadlines and watcher sleeps together.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;

/// Current wall-clock time, used for event timestamps only.
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// A point in monotonic time for session deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }

    /// Returns duration until `self`, or zero if `self` is in the past
    pub fn saturating_duration_until(&self, from: MonotonicInstant) -> Duration {
        if self.0 > from.0 {
            self.0.duration_since(from.0)
        } else {
            Duration::ZERO
        }
    }

    pub fn as_instant(&self) -> Instant {
        self.0
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

impl From<MonotonicInstant> for Instant {
    fn from(value: MonotonicInstant) -> Self {
        value.0
    }
}

/// Render a whole-minute duration the way users read it ("3 minutes").
pub fn format_minutes(duration: Duration) -> String {
    let minutes = (duration.as_secs() / 60).max(1);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}

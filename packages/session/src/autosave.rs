//! Periodic autosave scheduling.
//!
//! Purely a clock: the session decides whether firing actually saves
//! (only a dirty document does). Driven by the embedding loop passing its
//! notion of now, so tests never sleep.

use std::time::{Duration, Instant};

/// Interval between autosave checks.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Arm (or re-arm) the timer relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    /// Disarm the timer. It stays silent until scheduled again.
    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Consume a due firing and re-arm for the next interval. Returns
    /// whether the timer actually fired.
    pub fn fire(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}

//! Activity clock: when did the student last edit the canvas?

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::client::AnalysisMode;

/// Timestamp of the last user-originated edit.
///
/// Written from the surface's edit listener, read once at the start of each
/// pass to pick the request mode.
#[derive(Debug)]
pub struct ActivityClock {
    last_edit: Mutex<Instant>,
    idle_threshold: Duration,
}

impl ActivityClock {
    /// A clock that starts "just edited".
    #[must_use]
    pub fn new(idle_threshold: Duration) -> Self {
        Self { last_edit: Mutex::new(Instant::now()), idle_threshold }
    }

    pub fn record_edit(&self) {
        *self.last_edit.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    #[must_use]
    pub fn elapsed_since_edit(&self) -> Duration {
        self.last_edit.lock().unwrap_or_else(PoisonError::into_inner).elapsed()
    }

    /// `Idle` once strictly more than the threshold has passed, else `Active`.
    #[must_use]
    pub fn mode(&self) -> AnalysisMode {
        if self.elapsed_since_edit() > self.idle_threshold { AnalysisMode::Idle } else { AnalysisMode::Active }
    }

    /// Push the clock forward after an idle hint was delivered, so the next
    /// tick does not immediately ask for another one.
    pub fn bump(&self) {
        self.record_edit();
    }

    #[must_use]
    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;

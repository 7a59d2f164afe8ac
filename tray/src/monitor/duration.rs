//! Build duration tracking

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Estimates how long the running build has left, based on the duration of
/// the last successful build.
#[derive(Debug, Clone, Default)]
pub struct BuildDurationTracker {
    current_build_started_at: Option<DateTime<Utc>>,
    last_build_duration: Option<Duration>,
}

impl BuildDurationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_build_start(&mut self, now: DateTime<Utc>) {
        self.current_build_started_at = Some(now);
    }

    pub fn on_successful_build(&mut self, now: DateTime<Utc>) {
        if let Some(started_at) = self.current_build_started_at.take() {
            if let Ok(duration) = (now - started_at).to_std() {
                self.last_build_duration = Some(duration);
            }
        }
    }

    pub fn last_build_duration(&self) -> Option<Duration> {
        self.last_build_duration
    }

    /// `None` when no build is running or no successful build was timed yet.
    /// Overrunning builds report zero.
    pub fn estimated_time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started_at = self.current_build_started_at?;
        let expected = self.last_build_duration?;
        let elapsed = (now - started_at).to_std().unwrap_or_default();

        Some(expected.saturating_sub(elapsed))
    }
}

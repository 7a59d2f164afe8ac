//! Build transitions and their derivation from consecutive polls

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::snapshot::{Message, ProjectStatus};

/// Severity attached to a transition for notification purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// Change between two consecutive completed builds of one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTransition {
    Broken,
    Fixed,
    StillFailing,
    StillSuccessful,
}

impl BuildTransition {
    pub const ALL: [BuildTransition; 4] = [
        BuildTransition::Broken,
        BuildTransition::Fixed,
        BuildTransition::StillFailing,
        BuildTransition::StillSuccessful,
    ];

    /// Classify from the success of the previous and latest completed build
    pub fn between(was_ok: bool, is_ok: bool) -> Self {
        match (was_ok, is_ok) {
            (true, true) => BuildTransition::StillSuccessful,
            (false, false) => BuildTransition::StillFailing,
            (true, false) => BuildTransition::Broken,
            (false, true) => BuildTransition::Fixed,
        }
    }

    /// Position in `ALL`, used to index fixed-size lookup tables
    pub fn ordinal(&self) -> usize {
        match self {
            BuildTransition::Broken => 0,
            BuildTransition::Fixed => 1,
            BuildTransition::StillFailing => 2,
            BuildTransition::StillSuccessful => 3,
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            BuildTransition::Broken => "Broken build",
            BuildTransition::Fixed => "Fixed build",
            BuildTransition::StillFailing => "Build still failing",
            BuildTransition::StillSuccessful => "Yet another successful build",
        }
    }

    pub fn error_level(&self) -> ErrorLevel {
        match self {
            BuildTransition::Broken => ErrorLevel::Error,
            BuildTransition::Fixed => ErrorLevel::Info,
            BuildTransition::StillFailing => ErrorLevel::Warning,
            BuildTransition::StillSuccessful => ErrorLevel::Info,
        }
    }

    /// Message shown when the user configured none
    pub fn default_message(&self) -> &'static str {
        match self {
            BuildTransition::Broken => "Recent checkins have broken the build.",
            BuildTransition::Fixed => "Recent checkins have fixed the build.",
            BuildTransition::StillFailing => "The build is still broken...",
            BuildTransition::StillSuccessful => "Yet another successful build!",
        }
    }
}

impl fmt::Display for BuildTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caption())
    }
}

/// What happened between two consecutive successful polls of one project.
///
/// A build counts as completed when the last build time moved. Polls where
/// the project is merely building keep the previous build time, so they never
/// produce a transition.
#[derive(Debug, Clone, Copy)]
pub struct PollInterval<'a> {
    previous: &'a ProjectStatus,
    latest: &'a ProjectStatus,
}

impl<'a> PollInterval<'a> {
    pub fn new(previous: &'a ProjectStatus, latest: &'a ProjectStatus) -> Self {
        Self { previous, latest }
    }

    pub fn is_another_build_complete(&self) -> bool {
        self.previous.last_build_time != self.latest.last_build_time
    }

    pub fn was_latest_build_successful(&self) -> bool {
        self.latest.build_status.is_success()
    }

    pub fn has_new_build_started(&self) -> bool {
        let was_building = self.previous.activity.is_building();
        let is_building = self.latest.activity.is_building();

        (is_building && !was_building) || (is_building && self.is_another_build_complete())
    }

    pub fn build_transition(&self) -> BuildTransition {
        BuildTransition::between(
            self.previous.build_status.is_success(),
            self.latest.build_status.is_success(),
        )
    }

    /// Transition for this interval, only when a build completed
    pub fn completed_transition(&self) -> Option<BuildTransition> {
        self.is_another_build_complete()
            .then(|| self.build_transition())
    }

    /// Messages published since the previous poll
    pub fn new_messages(&self) -> &'a [Message] {
        let seen = self.previous.messages.len();
        self.latest.messages.get(seen..).unwrap_or(&[])
    }

    /// All messages of the latest status joined by newlines
    pub fn all_messages(&self) -> Message {
        let text = self
            .latest
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Message::new(text)
    }
}

//! Build states and their importance ordering

use std::fmt;

use serde::{Deserialize, Serialize};

/// Displayed state of a project.
///
/// Variants are declared from least to most important, so the derived `Ord`
/// is the aggregation order: the worst state of a group is its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Success,
    NotConnected,
    Building,
    Broken,
    BrokenAndBuilding,
}

impl ProjectState {
    pub const ALL: [ProjectState; 5] = [
        ProjectState::Success,
        ProjectState::NotConnected,
        ProjectState::Building,
        ProjectState::Broken,
        ProjectState::BrokenAndBuilding,
    ];

    /// Opaque tag used by presentation to pick an icon
    pub fn image_index(&self) -> usize {
        match self {
            ProjectState::Success => 0,
            ProjectState::NotConnected => 1,
            ProjectState::Building => 2,
            ProjectState::Broken => 3,
            ProjectState::BrokenAndBuilding => 4,
        }
    }

    pub fn is_more_important_than(&self, other: ProjectState) -> bool {
        *self > other
    }

    /// Worst state of a group; an empty group is `Success`
    pub fn worst<I>(states: I) -> ProjectState
    where
        I: IntoIterator<Item = ProjectState>,
    {
        states
            .into_iter()
            .max()
            .unwrap_or(ProjectState::Success)
    }

    /// Classify a fetched status; `None` means the fetch failed
    pub fn classify(build_status: Option<IntegrationStatus>, activity: ProjectActivity) -> Self {
        let Some(build_status) = build_status else {
            return ProjectState::NotConnected;
        };

        match (activity.is_building(), build_status == IntegrationStatus::Success) {
            (true, true) => ProjectState::Building,
            (true, false) => ProjectState::BrokenAndBuilding,
            (false, true) => ProjectState::Success,
            (false, false) => ProjectState::Broken,
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectState::Success => "Success",
            ProjectState::NotConnected => "NotConnected",
            ProjectState::Building => "Building",
            ProjectState::Broken => "Broken",
            ProjectState::BrokenAndBuilding => "BrokenAndBuilding",
        };
        f.write_str(s)
    }
}

/// Outcome of the last completed integration, as reported by the server.
///
/// Declared from least to most severe: `Success < Unknown < Exception < Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Success,
    #[default]
    Unknown,
    Exception,
    Failure,
}

impl IntegrationStatus {
    pub fn is_success(&self) -> bool {
        *self == IntegrationStatus::Success
    }

    /// Worst status of a group; an empty group is `Success`
    pub fn worst<I>(statuses: I) -> IntegrationStatus
    where
        I: IntoIterator<Item = IntegrationStatus>,
    {
        statuses
            .into_iter()
            .max()
            .unwrap_or(IntegrationStatus::Success)
    }
}

/// What the project integrator is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectActivity {
    #[default]
    Sleeping,
    Building,
    CheckingModifications,
    Pending,
}

impl ProjectActivity {
    pub fn is_building(&self) -> bool {
        *self == ProjectActivity::Building
    }

    pub fn is_pending(&self) -> bool {
        *self == ProjectActivity::Pending
    }
}

impl fmt::Display for ProjectActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectActivity::Sleeping => "Sleeping",
            ProjectActivity::Building => "Building",
            ProjectActivity::CheckingModifications => "CheckingModifications",
            ProjectActivity::Pending => "Pending",
        };
        f.write_str(s)
    }
}

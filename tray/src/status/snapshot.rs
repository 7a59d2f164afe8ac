//! Per-poll project status snapshots

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;
use crate::status::state::{IntegrationStatus, ProjectActivity, ProjectState};

/// A message published by the build server for a project
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Project status as returned by one successful fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatus {
    /// Project name
    pub name: String,

    /// Name of the server hosting the project
    #[serde(default)]
    pub server_name: String,

    /// Outcome of the last completed integration
    pub build_status: IntegrationStatus,

    /// Current integrator activity
    #[serde(default)]
    pub activity: ProjectActivity,

    /// Label of the last completed build
    #[serde(default)]
    pub last_build_label: String,

    /// Completion time of the last build
    pub last_build_time: DateTime<Utc>,

    /// Next scheduled build, when known
    #[serde(default)]
    pub next_build_time: Option<DateTime<Utc>>,

    /// Link to the project page on the server dashboard
    #[serde(default)]
    pub web_url: String,

    /// Free-form description of the running build stage
    #[serde(default)]
    pub build_stage: String,

    /// Messages published for the project, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ProjectStatus {
    pub fn new(
        name: impl Into<String>,
        build_status: IntegrationStatus,
        activity: ProjectActivity,
        last_build_time: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            server_name: String::new(),
            build_status,
            activity,
            last_build_label: String::new(),
            last_build_time,
            next_build_time: None,
            web_url: String::new(),
            build_stage: String::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.last_build_label = label.into();
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn state(&self) -> ProjectState {
        ProjectState::classify(Some(self.build_status), self.activity)
    }

    /// Latest message, if any
    pub fn current_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Result of one poll of a single project.
///
/// Built fresh on every poll. A failed fetch yields a `NotConnected` snapshot
/// carrying the connection error instead of a status.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    /// Project name
    pub project_name: String,

    /// Classified state
    pub state: ProjectState,

    /// Fetched status, `None` when the fetch failed
    pub status: Option<ProjectStatus>,

    /// Error of the failed fetch
    pub connect_error: Option<Arc<MonitorError>>,

    /// Poll counter of the owning monitor, starting at 1
    pub sequence: u64,

    /// When the poll finished
    pub polled_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    pub fn connected(status: ProjectStatus, sequence: u64) -> Self {
        Self {
            project_name: status.name.clone(),
            state: status.state(),
            status: Some(status),
            connect_error: None,
            sequence,
            polled_at: Utc::now(),
        }
    }

    pub fn not_connected(project_name: impl Into<String>, error: MonitorError, sequence: u64) -> Self {
        Self {
            project_name: project_name.into(),
            state: ProjectState::NotConnected,
            status: None,
            connect_error: Some(Arc::new(error)),
            sequence,
            polled_at: Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_some()
    }

    pub fn integration_status(&self) -> IntegrationStatus {
        self.status
            .as_ref()
            .map(|s| s.build_status)
            .unwrap_or(IntegrationStatus::Unknown)
    }

    pub fn activity(&self) -> Option<ProjectActivity> {
        self.status.as_ref().map(|s| s.activity)
    }

    pub fn last_build_label(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.last_build_label.as_str())
            .unwrap_or("")
    }

    pub fn last_build_time(&self) -> Option<DateTime<Utc>> {
        self.status.as_ref().map(|s| s.last_build_time)
    }

    pub fn next_build_time(&self) -> Option<DateTime<Utc>> {
        self.status.as_ref().and_then(|s| s.next_build_time)
    }

    pub fn is_pending(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| s.activity.is_pending())
            .unwrap_or(false)
    }

    /// One-line summary, empty when the project is healthy
    pub fn summary(&self) -> String {
        if self.state == ProjectState::Success {
            return String::new();
        }
        format!("{}: {}", self.project_name, self.state)
    }
}

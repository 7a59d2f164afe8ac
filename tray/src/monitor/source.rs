//! Collaborators that talk to build servers

use std::fmt;

use async_trait::async_trait;

use crate::errors::MonitorError;
use crate::status::{ProjectStatus, ServerSnapshot, StatusItem};

/// Command sent to the server on behalf of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCommand {
    ForceBuild,
    AbortBuild,
    StartProject,
    StopProject,
    CancelPending,
    FixBuild { user_name: String },
}

impl ProjectCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectCommand::ForceBuild => "force_build",
            ProjectCommand::AbortBuild => "abort_build",
            ProjectCommand::StartProject => "start_project",
            ProjectCommand::StopProject => "stop_project",
            ProjectCommand::CancelPending => "cancel_pending",
            ProjectCommand::FixBuild { .. } => "fix_build",
        }
    }
}

impl fmt::Display for ProjectCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fetches the status of one project and forwards commands for it.
///
/// Timeouts are the implementation's business; monitors wait as long as a
/// call takes.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    fn project_name(&self) -> &str;

    async fn fetch_project_status(&self) -> Result<ProjectStatus, MonitorError>;

    async fn execute(&self, command: ProjectCommand) -> Result<(), MonitorError>;

    /// Log in again after the session expired. Returns whether it worked.
    async fn refresh_session(&self) -> Result<bool, MonitorError> {
        Ok(false)
    }

    /// Detailed status tree of the current build
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        Err(MonitorError::Unsupported(format!(
            "status snapshot for '{}'",
            self.project_name()
        )))
    }
}

/// Fetches a whole-server snapshot: project statuses plus integration queues
#[async_trait]
pub trait ServerSource: Send + Sync {
    fn display_name(&self) -> &str;

    async fn fetch_server_snapshot(&self) -> Result<ServerSnapshot, MonitorError>;

    async fn cancel_pending_request(&self, project_name: &str) -> Result<(), MonitorError>;

    async fn login(&self) -> Result<bool, MonitorError> {
        Ok(true)
    }

    async fn logout(&self) -> Result<(), MonitorError> {
        Ok(())
    }

    /// Drop anything cached so the next fetch hits the server
    fn invalidate_cache(&self) {}
}

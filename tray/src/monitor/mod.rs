//! Project and server monitors

pub mod aggregate;
pub mod duration;
pub mod events;
pub mod project;
pub mod server;
pub mod source;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MonitorError;
use crate::status::{IntegrationStatus, ProjectSnapshot, ProjectState, ProjectStatus, QueueSetSnapshot};

pub use aggregate::AggregatingMonitor;
pub use events::MonitorEvent;
pub use project::ProjectMonitor;
pub use server::ServerMonitor;
pub use source::{ProjectCommand, ProjectSource, ServerSource};

/// Anything that can be polled.
///
/// `poll` never fails: fetch errors become state. It returns the events
/// raised during the cycle in emission order. A given monitor must not be
/// polled by two callers at once.
#[async_trait]
pub trait Monitor: Send + Sync {
    fn name(&self) -> &str;

    async fn poll(&self) -> Vec<MonitorEvent>;
}

/// Monitor of one project, or of a group of projects seen as one
#[async_trait]
pub trait ProjectMonitorExt: Monitor {
    fn project_state(&self) -> ProjectState;

    fn integration_status(&self) -> IntegrationStatus;

    /// Empty when everything is fine
    fn summary_status(&self) -> String;

    /// Latest snapshot of a single project; `None` before the first poll
    fn snapshot(&self) -> Option<ProjectSnapshot>;

    fn is_pending(&self) -> bool;

    fn estimated_time_remaining(&self) -> Option<Duration>;

    async fn force_build(&self) -> Result<(), MonitorError>;

    async fn abort_build(&self) -> Result<(), MonitorError>;

    async fn start_project(&self) -> Result<(), MonitorError>;

    async fn stop_project(&self) -> Result<(), MonitorError>;

    async fn cancel_pending(&self) -> Result<(), MonitorError>;

    async fn fix_build(&self, user_name: &str) -> Result<(), MonitorError>;
}

/// Monitor of a whole build server
#[async_trait]
pub trait ServerMonitorExt: Monitor {
    fn is_connected(&self) -> bool;

    /// Queues from the latest successful poll
    fn queue_set(&self) -> Option<QueueSetSnapshot>;

    /// Status of a hosted project from the latest poll.
    ///
    /// `Ok(None)` before the first successful poll.
    fn project_status(&self, project_name: &str) -> Result<Option<ProjectStatus>, MonitorError>;

    async fn cancel_pending_request(&self, project_name: &str) -> Result<(), MonitorError>;
}

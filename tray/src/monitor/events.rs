//! Events raised by monitors

use std::sync::Arc;

use crate::errors::MonitorError;
use crate::status::{
    BuildTransition, IntegrationStatus, Message, ProjectSnapshot, ProjectState, ProjectStatus,
    QueueSetSnapshot, ServerSnapshot,
};

/// Any event a monitor can raise during a poll cycle
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Polled(Polled),
    BuildOccurred(BuildOccurred),
    QueueChanged(QueueChanged),
    MessageReceived(MessageReceived),
    ServerSnapshotChanged(ServerSnapshotChanged),
}

impl MonitorEvent {
    /// Name of the monitor that raised the event
    pub fn source(&self) -> &str {
        match self {
            MonitorEvent::Polled(e) => &e.source,
            MonitorEvent::BuildOccurred(e) => &e.source,
            MonitorEvent::QueueChanged(e) => &e.source,
            MonitorEvent::MessageReceived(e) => &e.project_name,
            MonitorEvent::ServerSnapshotChanged(e) => &e.source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::Polled(_) => "polled",
            MonitorEvent::BuildOccurred(_) => "build_occurred",
            MonitorEvent::QueueChanged(_) => "queue_changed",
            MonitorEvent::MessageReceived(_) => "message_received",
            MonitorEvent::ServerSnapshotChanged(_) => "server_snapshot_changed",
        }
    }

    pub fn as_polled(&self) -> Option<&Polled> {
        match self {
            MonitorEvent::Polled(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_build_occurred(&self) -> Option<&BuildOccurred> {
        match self {
            MonitorEvent::BuildOccurred(e) => Some(e),
            _ => None,
        }
    }
}

/// Raised after every poll, successful or not
#[derive(Debug, Clone)]
pub struct Polled {
    pub source: String,

    /// Poll counter of the source monitor, starting at 1
    pub sequence: u64,

    pub payload: PolledPayload,
}

/// What the polled monitor knows after the poll
#[derive(Debug, Clone)]
pub enum PolledPayload {
    Project(ProjectSnapshot),
    Aggregate(AggregateSnapshot),
    Server(ServerPollSnapshot),
}

impl Polled {
    pub fn state(&self) -> Option<ProjectState> {
        match &self.payload {
            PolledPayload::Project(s) => Some(s.state),
            PolledPayload::Aggregate(s) => Some(s.state),
            PolledPayload::Server(_) => None,
        }
    }
}

/// Combined view of all children of an aggregating monitor
#[derive(Debug, Clone)]
pub struct AggregateSnapshot {
    pub state: ProjectState,
    pub integration_status: IntegrationStatus,
    pub children: Vec<ProjectSnapshot>,
}

/// Result of one server poll
#[derive(Debug, Clone)]
pub struct ServerPollSnapshot {
    pub snapshot: Option<ServerSnapshot>,
    pub connect_error: Option<Arc<MonitorError>>,
}

/// Raised at most once per completed build
#[derive(Debug, Clone)]
pub struct BuildOccurred {
    /// Project whose build completed
    pub source: String,
    pub transition: BuildTransition,

    /// Project state right after the build
    pub state: ProjectState,
    pub status: ProjectStatus,
}

/// Raised when a server's integration queues differ from the previous poll
#[derive(Debug, Clone)]
pub struct QueueChanged {
    pub source: String,

    /// `None` when the server could not be reached
    pub queue_set: Option<QueueSetSnapshot>,
}

/// Passthrough of a message published by the server for a project
#[derive(Debug, Clone)]
pub struct MessageReceived {
    pub project_name: String,
    pub message: Message,
}

/// Raised when the set of projects hosted by a server changes
#[derive(Debug, Clone)]
pub struct ServerSnapshotChanged {
    pub source: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

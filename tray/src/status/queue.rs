//! Server-side integration queue snapshots

use serde::{Deserialize, Serialize};

use crate::status::snapshot::ProjectStatus;
use crate::status::state::ProjectActivity;

/// One pending project request on a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequestSnapshot {
    pub project_name: String,

    #[serde(default)]
    pub activity: ProjectActivity,
}

impl QueuedRequestSnapshot {
    pub fn new(project_name: impl Into<String>, activity: ProjectActivity) -> Self {
        Self {
            project_name: project_name.into(),
            activity,
        }
    }
}

/// A named integration queue. Index 0 of `requests` builds next.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: String,

    #[serde(default)]
    pub requests: Vec<QueuedRequestSnapshot>,
}

impl QueueSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: Vec::new(),
        }
    }

    pub fn with_request(mut self, request: QueuedRequestSnapshot) -> Self {
        self.requests.push(request);
        self
    }

    /// Request that will be built next
    pub fn head(&self) -> Option<&QueuedRequestSnapshot> {
        self.requests.first()
    }
}

/// All queues of one server, in server order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueSetSnapshot {
    #[serde(default)]
    pub queues: Vec<QueueSnapshot>,
}

impl QueueSetSnapshot {
    pub fn new(queues: Vec<QueueSnapshot>) -> Self {
        Self { queues }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&QueueSnapshot> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn is_changed(&self, other: &QueueSetSnapshot) -> bool {
        self != other
    }
}

/// Everything one server poll returns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerSnapshot {
    #[serde(default)]
    pub projects: Vec<ProjectStatus>,

    #[serde(default)]
    pub queue_set: QueueSetSnapshot,
}

impl ServerSnapshot {
    pub fn project(&self, name: &str) -> Option<&ProjectStatus> {
        self.projects.iter().find(|p| p.name == name)
    }
}

//! Aggregation of many project monitors into one

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error};

use crate::errors::MonitorError;
use crate::monitor::events::{AggregateSnapshot, BuildOccurred, MonitorEvent, Polled, PolledPayload};
use crate::monitor::{Monitor, ProjectMonitorExt};
use crate::status::{IntegrationStatus, ProjectSnapshot, ProjectState, StatusItem};
use crate::view::builders::{project_items, state_item_status};
use crate::view::refresh::SnapshotSource;

const ALL_GOOD: &str = "All builds are good";

/// A virtual project monitor whose state is the worst of its children.
///
/// One poll polls every child in order. It raises a single `Polled`, at most
/// one `BuildOccurred` (from the child whose resulting state is the most
/// important, first child on ties) and passes any other child events through.
pub struct AggregatingMonitor {
    name: String,
    children: Vec<Arc<dyn ProjectMonitorExt>>,
    sequence: AtomicU64,
}

impl AggregatingMonitor {
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn ProjectMonitorExt>>) -> Self {
        Self {
            name: name.into(),
            children,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn children(&self) -> &[Arc<dyn ProjectMonitorExt>] {
        &self.children
    }

    pub fn child_snapshots(&self) -> Vec<ProjectSnapshot> {
        self.children.iter().filter_map(|c| c.snapshot()).collect()
    }

    fn unsupported(&self, operation: &str) -> MonitorError {
        MonitorError::Unsupported(format!("{} on aggregate '{}'", operation, self.name))
    }
}

/// Pick the build to forward: most important resulting state, earliest on ties
fn most_important(builds: Vec<BuildOccurred>) -> Option<BuildOccurred> {
    builds.into_iter().fold(None, |best, candidate| match best {
        Some(current) if !candidate.state.is_more_important_than(current.state) => Some(current),
        _ => Some(candidate),
    })
}

#[async_trait]
impl Monitor for AggregatingMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&self) -> Vec<MonitorEvent> {
        let mut builds = Vec::new();
        let mut passthrough = Vec::new();

        for child in &self.children {
            let events = match AssertUnwindSafe(child.poll()).catch_unwind().await {
                Ok(events) => events,
                Err(_) => {
                    error!("Poll of '{}' panicked, continuing with the rest", child.name());
                    continue;
                }
            };

            for event in events {
                match event {
                    MonitorEvent::Polled(_) => {}
                    MonitorEvent::BuildOccurred(build) => builds.push(build),
                    other => passthrough.push(other),
                }
            }
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = AggregateSnapshot {
            state: self.project_state(),
            integration_status: self.integration_status(),
            children: self.child_snapshots(),
        };
        debug!(
            "Polled {} projects of '{}' (#{}): {}",
            self.children.len(),
            self.name,
            sequence,
            snapshot.state
        );

        let mut events = vec![MonitorEvent::Polled(Polled {
            source: self.name.clone(),
            sequence,
            payload: PolledPayload::Aggregate(snapshot),
        })];
        if let Some(build) = most_important(builds) {
            events.push(MonitorEvent::BuildOccurred(build));
        }
        events.extend(passthrough);

        events
    }
}

#[async_trait]
impl ProjectMonitorExt for AggregatingMonitor {
    fn project_state(&self) -> ProjectState {
        ProjectState::worst(self.children.iter().map(|c| c.project_state()))
    }

    fn integration_status(&self) -> IntegrationStatus {
        IntegrationStatus::worst(self.children.iter().map(|c| c.integration_status()))
    }

    fn summary_status(&self) -> String {
        let lines: Vec<String> = self
            .children
            .iter()
            .map(|c| c.summary_status())
            .filter(|s| !s.is_empty())
            .collect();

        if lines.is_empty() {
            return ALL_GOOD.to_string();
        }
        lines.join("\n")
    }

    fn snapshot(&self) -> Option<ProjectSnapshot> {
        None
    }

    fn is_pending(&self) -> bool {
        self.children.iter().any(|c| c.is_pending())
    }

    fn estimated_time_remaining(&self) -> Option<Duration> {
        None
    }

    async fn force_build(&self) -> Result<(), MonitorError> {
        Err(self.unsupported("force build"))
    }

    async fn abort_build(&self) -> Result<(), MonitorError> {
        Err(self.unsupported("abort build"))
    }

    async fn start_project(&self) -> Result<(), MonitorError> {
        Err(self.unsupported("start project"))
    }

    async fn stop_project(&self) -> Result<(), MonitorError> {
        Err(self.unsupported("stop project"))
    }

    async fn cancel_pending(&self) -> Result<(), MonitorError> {
        Err(self.unsupported("cancel pending"))
    }

    async fn fix_build(&self, _user_name: &str) -> Result<(), MonitorError> {
        Err(self.unsupported("fix build"))
    }
}

/// One node per polled child under the aggregate
#[async_trait]
impl SnapshotSource for AggregatingMonitor {
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        Ok(StatusItem::new(
            format!("aggregate:{}", self.name),
            self.name.clone(),
            state_item_status(self.project_state()),
        )
        .with_children(project_items(&self.child_snapshots())))
    }
}

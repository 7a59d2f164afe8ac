//! Build server monitor

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::MonitorError;
use crate::monitor::events::{
    MonitorEvent, Polled, PolledPayload, QueueChanged, ServerPollSnapshot, ServerSnapshotChanged,
};
use crate::monitor::source::ServerSource;
use crate::monitor::{Monitor, ServerMonitorExt};
use crate::status::{ProjectStatus, QueueSetSnapshot, ServerSnapshot, StatusItem};
use crate::view::builders::queue_set_item;
use crate::view::refresh::SnapshotSource;

#[derive(Debug, Default)]
struct ServerMonitorState {
    latest: Option<ServerSnapshot>,
    connect_error: Option<Arc<MonitorError>>,

    /// Project names seen on the server, in discovery order
    known_projects: Vec<String>,
    projects_loaded: bool,

    sequence: u64,
}

/// Polls a whole server and raises `Polled`, `QueueChanged` and
/// `ServerSnapshotChanged` events.
pub struct ServerMonitor {
    source: Arc<dyn ServerSource>,
    state: RwLock<ServerMonitorState>,
}

impl ServerMonitor {
    pub fn new(source: Arc<dyn ServerSource>) -> Self {
        Self {
            source,
            state: RwLock::new(ServerMonitorState::default()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.source.display_name()
    }

    pub fn snapshot(&self) -> Option<ServerSnapshot> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.latest.clone()
    }

    pub fn connect_error(&self) -> Option<Arc<MonitorError>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.connect_error.clone()
    }

    pub async fn start(&self) -> Result<bool, MonitorError> {
        info!("Logging in to '{}'", self.display_name());
        self.source.login().await
    }

    pub async fn stop(&self) -> Result<(), MonitorError> {
        info!("Logging out of '{}'", self.display_name());
        self.source.logout().await
    }

    pub async fn refresh_session(&self) -> Result<bool, MonitorError> {
        self.source.logout().await?;
        self.source.login().await
    }

    fn record(&self, result: Result<ServerSnapshot, MonitorError>) -> Vec<MonitorEvent> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.sequence += 1;
        let sequence = state.sequence;
        let source = self.display_name().to_string();

        let (queue_changed, project_changes) = match result {
            Ok(snapshot) => {
                let queue_changed = state
                    .latest
                    .as_ref()
                    .map(|last| last.queue_set.is_changed(&snapshot.queue_set))
                    .unwrap_or(true);
                let project_changes = detect_project_changes(&mut state, &snapshot);

                state.latest = Some(snapshot);
                state.connect_error = None;
                (queue_changed, project_changes)
            }
            Err(e) => {
                warn!("Poll of server '{}' failed: {}", source, e);
                state.latest = None;
                state.connect_error = Some(Arc::new(e));
                (true, None)
            }
        };

        let payload = ServerPollSnapshot {
            snapshot: state.latest.clone(),
            connect_error: state.connect_error.clone(),
        };
        let queue_set = state.latest.as_ref().map(|s| s.queue_set.clone());
        drop(state);

        debug!("Polled server '{}' (#{})", source, sequence);

        let mut events = vec![MonitorEvent::Polled(Polled {
            source: source.clone(),
            sequence,
            payload: PolledPayload::Server(payload),
        })];

        if queue_changed {
            events.push(MonitorEvent::QueueChanged(QueueChanged {
                source: source.clone(),
                queue_set,
            }));
        }

        if let Some((added, removed)) = project_changes {
            info!(
                "Projects changed on '{}': {} added, {} removed",
                source,
                added.len(),
                removed.len()
            );
            events.push(MonitorEvent::ServerSnapshotChanged(ServerSnapshotChanged {
                source,
                added,
                removed,
            }));
        }

        events
    }
}

/// Update the known project list. Returns the changes once the initial list
/// has been loaded.
fn detect_project_changes(
    state: &mut ServerMonitorState,
    snapshot: &ServerSnapshot,
) -> Option<(Vec<String>, Vec<String>)> {
    let fresh: HashSet<&str> = snapshot.projects.iter().map(|p| p.name.as_str()).collect();
    let known: HashSet<&str> = state.known_projects.iter().map(String::as_str).collect();

    let added: Vec<String> = snapshot
        .projects
        .iter()
        .filter(|p| !known.contains(p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();
    let removed: Vec<String> = state
        .known_projects
        .iter()
        .filter(|name| !fresh.contains(name.as_str()))
        .cloned()
        .collect();

    let was_loaded = state.projects_loaded;
    state.projects_loaded = true;

    if added.is_empty() && removed.is_empty() {
        return None;
    }

    state.known_projects.retain(|name| !removed.contains(name));
    state.known_projects.extend(added.iter().cloned());

    was_loaded.then_some((added, removed))
}

#[async_trait]
impl Monitor for ServerMonitor {
    fn name(&self) -> &str {
        self.display_name()
    }

    async fn poll(&self) -> Vec<MonitorEvent> {
        self.source.invalidate_cache();
        let result = self.source.fetch_server_snapshot().await;
        self.record(result)
    }
}

#[async_trait]
impl ServerMonitorExt for ServerMonitor {
    fn is_connected(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.latest.is_some()
    }

    fn queue_set(&self) -> Option<QueueSetSnapshot> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.latest.as_ref().map(|s| s.queue_set.clone())
    }

    fn project_status(&self, project_name: &str) -> Result<Option<ProjectStatus>, MonitorError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let Some(latest) = state.latest.as_ref() else {
            return Ok(None);
        };

        latest
            .project(project_name)
            .cloned()
            .map(Some)
            .ok_or_else(|| MonitorError::ProjectNotFound(project_name.to_string()))
    }

    async fn cancel_pending_request(&self, project_name: &str) -> Result<(), MonitorError> {
        self.source.cancel_pending_request(project_name).await
    }
}

/// Queue tree of the latest poll
#[async_trait]
impl SnapshotSource for ServerMonitor {
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        match self.queue_set() {
            Some(queue_set) => Ok(queue_set_item(self.display_name(), &queue_set)),
            None => Err(MonitorError::ConnectionError(format!(
                "No queue snapshot from '{}' yet",
                self.display_name()
            ))),
        }
    }
}

//! Single project monitor

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::errors::MonitorError;
use crate::monitor::duration::BuildDurationTracker;
use crate::monitor::events::{BuildOccurred, MessageReceived, MonitorEvent, Polled, PolledPayload};
use crate::monitor::source::{ProjectCommand, ProjectSource};
use crate::monitor::{Monitor, ProjectMonitorExt};
use crate::status::{
    IntegrationStatus, Message, PollInterval, ProjectSnapshot, ProjectState, ProjectStatus, StatusItem,
};
use crate::view::refresh::SnapshotSource;

#[derive(Debug, Default)]
struct ProjectMonitorState {
    /// Snapshot of the latest poll
    latest: Option<ProjectSnapshot>,

    /// Status of the previous poll; cleared when a fetch fails
    previous: Option<ProjectStatus>,

    sequence: u64,
    durations: BuildDurationTracker,
}

/// Polls one project and raises `Polled`, `BuildOccurred` and
/// `MessageReceived` events.
pub struct ProjectMonitor {
    source: Arc<dyn ProjectSource>,
    state: RwLock<ProjectMonitorState>,
}

impl ProjectMonitor {
    pub fn new(source: Arc<dyn ProjectSource>) -> Self {
        Self {
            source,
            state: RwLock::new(ProjectMonitorState::default()),
        }
    }

    pub fn project_name(&self) -> &str {
        self.source.project_name()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().map(|s| s.is_connected()).unwrap_or(false)
    }

    /// Error of the latest poll, if it failed
    pub fn connect_error(&self) -> Option<Arc<MonitorError>> {
        self.snapshot().and_then(|s| s.connect_error)
    }

    /// Store the outcome of a fetch and derive this cycle's events
    fn record(&self, result: Result<ProjectStatus, MonitorError>) -> Vec<MonitorEvent> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.sequence += 1;
        let sequence = state.sequence;

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                warn!("Poll of project '{}' failed: {}", self.project_name(), e);
                let snapshot = ProjectSnapshot::not_connected(self.project_name(), e, sequence);
                state.latest = Some(snapshot.clone());
                state.previous = None;
                return vec![MonitorEvent::Polled(Polled {
                    source: self.project_name().to_string(),
                    sequence,
                    payload: PolledPayload::Project(snapshot),
                })];
            }
        };

        let mut transition = None;
        let mut new_messages: Vec<Message> = Vec::new();
        if let Some(previous) = state.previous.take() {
            let interval = PollInterval::new(&previous, &status);
            let now = Utc::now();

            if interval.is_another_build_complete() && interval.was_latest_build_successful() {
                state.durations.on_successful_build(now);
            }
            if interval.has_new_build_started() {
                state.durations.on_build_start(now);
            }
            transition = interval.completed_transition();
            new_messages = interval.new_messages().to_vec();
        }

        let snapshot = ProjectSnapshot::connected(status.clone(), sequence);
        let project_state = snapshot.state;
        state.latest = Some(snapshot.clone());
        state.previous = Some(status.clone());
        drop(state);

        debug!(
            "Polled project '{}' (#{}): {}",
            self.project_name(),
            sequence,
            project_state
        );

        let mut events = vec![MonitorEvent::Polled(Polled {
            source: self.project_name().to_string(),
            sequence,
            payload: PolledPayload::Project(snapshot),
        })];

        if let Some(transition) = transition {
            info!("Build occurred on '{}': {}", self.project_name(), transition);
            events.push(MonitorEvent::BuildOccurred(BuildOccurred {
                source: self.project_name().to_string(),
                transition,
                state: project_state,
                status,
            }));
        }

        events.extend(new_messages.into_iter().map(|message| {
            MonitorEvent::MessageReceived(MessageReceived {
                project_name: self.project_name().to_string(),
                message,
            })
        }));

        events
    }

    /// Run a command, logging in again once if the session expired
    async fn run_command(&self, command: ProjectCommand) -> Result<(), MonitorError> {
        debug!("Sending {} for '{}'", command, self.project_name());

        match self.source.execute(command.clone()).await {
            Err(e) if e.is_session_invalid() => {
                warn!(
                    "Session expired while sending {} for '{}', logging in again",
                    command,
                    self.project_name()
                );
                if self.source.refresh_session().await? {
                    self.source.execute(command).await
                } else {
                    Err(e)
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl Monitor for ProjectMonitor {
    fn name(&self) -> &str {
        self.project_name()
    }

    async fn poll(&self) -> Vec<MonitorEvent> {
        let result = self.source.fetch_project_status().await;
        self.record(result)
    }
}

#[async_trait]
impl ProjectMonitorExt for ProjectMonitor {
    fn project_state(&self) -> ProjectState {
        self.snapshot()
            .map(|s| s.state)
            .unwrap_or(ProjectState::NotConnected)
    }

    fn integration_status(&self) -> IntegrationStatus {
        self.snapshot()
            .map(|s| s.integration_status())
            .unwrap_or(IntegrationStatus::Unknown)
    }

    fn summary_status(&self) -> String {
        match self.snapshot() {
            Some(snapshot) => snapshot.summary(),
            None => format!("{}: {}", self.project_name(), ProjectState::NotConnected),
        }
    }

    fn snapshot(&self) -> Option<ProjectSnapshot> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.latest.clone()
    }

    fn is_pending(&self) -> bool {
        self.snapshot().map(|s| s.is_pending()).unwrap_or(false)
    }

    fn estimated_time_remaining(&self) -> Option<Duration> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.durations.estimated_time_remaining(Utc::now())
    }

    async fn force_build(&self) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::ForceBuild).await
    }

    async fn abort_build(&self) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::AbortBuild).await
    }

    async fn start_project(&self) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::StartProject).await
    }

    async fn stop_project(&self) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::StopProject).await
    }

    async fn cancel_pending(&self) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::CancelPending).await
    }

    async fn fix_build(&self, user_name: &str) -> Result<(), MonitorError> {
        self.run_command(ProjectCommand::FixBuild {
            user_name: user_name.to_string(),
        })
        .await
    }
}

#[async_trait]
impl SnapshotSource for ProjectMonitor {
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        self.source.retrieve_snapshot().await
    }
}

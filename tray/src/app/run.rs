//! Main application run loop

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::errors::MonitorError;
use crate::http::{Credentials, HttpClient, HttpProjectSource, HttpServerSource, ServerConnection};
use crate::monitor::{AggregatingMonitor, Monitor, MonitorEvent, ProjectMonitor, ProjectMonitorExt, ServerMonitor};
use crate::notify::{
    BalloonNotifier, ExecNotifier, ExternalSoundPlayer, LogNotificationSink, ShellCommandRunner, SoundNotifier,
};
use crate::status::{ProjectSnapshot, ProjectState};
use crate::storage::settings::{NotificationSettings, ServerSettings};
use crate::sync::{self, Dispatch, EventBus, EventPump, Synchronized};
use crate::view::{RefreshOutcome, SnapshotView, ViewTree};
use crate::workers::poller::Poller;

/// Run the build monitor until the shutdown signal resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), MonitorError> {
    info!("Initializing build monitor...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start monitor: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

/// Monitors and server connections built from the options
pub struct Monitors {
    pub aggregate: Arc<AggregatingMonitor>,
    pub servers: Vec<Arc<ServerMonitor>>,
    pub connections: Vec<Arc<ServerConnection>>,
}

pub fn build_monitors(options: &AppOptions) -> Result<Monitors, MonitorError> {
    let mut connections: HashMap<String, Arc<ServerConnection>> = HashMap::new();
    let mut connection_order = Vec::new();

    let mut connection_for = |url: &str| -> Result<Arc<ServerConnection>, MonitorError> {
        if let Some(connection) = connections.get(url) {
            return Ok(connection.clone());
        }
        let connection = Arc::new(ServerConnection::new(
            HttpClient::new(url, options.request_timeout)?,
            options.server(url).and_then(credentials),
        ));
        connections.insert(url.to_string(), connection.clone());
        connection_order.push(connection.clone());
        Ok(connection)
    };

    let mut children: Vec<Arc<dyn ProjectMonitorExt>> = Vec::with_capacity(options.projects.len());
    for project in &options.projects {
        let source = HttpProjectSource::new(connection_for(&project.server_url)?, project.project_name.clone());
        children.push(Arc::new(ProjectMonitor::new(Arc::new(source))));
    }

    let mut servers = Vec::new();
    for server in options.servers.iter().filter(|s| s.watch_queues) {
        let source = HttpServerSource::new(connection_for(&server.url)?, server.display_name());
        servers.push(Arc::new(ServerMonitor::new(Arc::new(source))));
    }

    Ok(Monitors {
        aggregate: Arc::new(AggregatingMonitor::new(options.aggregate_name.clone(), children)),
        servers,
        connections: connection_order,
    })
}

fn credentials(server: &ServerSettings) -> Option<Credentials> {
    match (&server.user_name, &server.password) {
        (Some(user_name), Some(password)) => Some(Credentials {
            user_name: user_name.clone(),
            password: password.clone(),
        }),
        _ => None,
    }
}

/// Handlers for the configured notifications
pub fn build_event_bus(settings: &NotificationSettings) -> EventBus {
    let mut bus = EventBus::new();

    let sounds = settings.sounds.to_table();
    if !sounds.is_empty() {
        let player = match &settings.sound_player {
            Some(program) => ExternalSoundPlayer::new(program.clone()),
            None => ExternalSoundPlayer::default(),
        };
        bus.subscribe(Arc::new(SoundNotifier::new(sounds, Arc::new(player))));
    }

    let commands = settings.commands.to_table();
    if !commands.is_empty() {
        bus.subscribe(Arc::new(ExecNotifier::new(commands, Arc::new(ShellCommandRunner))));
    }

    if settings.show_balloons {
        bus.subscribe(Arc::new(BalloonNotifier::new(
            settings.messages.to_table(),
            Arc::new(LogNotificationSink),
        )));
    }

    bus
}

async fn login_all(connections: &[Arc<ServerConnection>]) {
    for connection in connections {
        match connection.login().await {
            Ok(true) => {}
            Ok(false) => warn!("Login to {} rejected, continuing anonymously", connection.client().base_url()),
            Err(e) => error!("Failed to log in to {}: {}", connection.client().base_url(), e),
        }
    }
}

async fn logout_all(connections: &[Arc<ServerConnection>]) {
    for connection in connections {
        if let Err(e) = connection.logout().await {
            warn!("Failed to log out of {}: {}", connection.client().base_url(), e);
        }
    }
}

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), MonitorError> {
    let monitors = build_monitors(options)?;
    if monitors.aggregate.children().is_empty() && monitors.servers.is_empty() {
        warn!("No projects or servers configured, nothing will be polled");
    }

    login_all(&monitors.connections).await;
    shutdown_manager.with_connections(monitors.connections.clone());

    let (dispatcher, receiver) = sync::channel();
    let dispatcher: Arc<dyn Dispatch> = Arc::new(dispatcher);

    init_event_pump(
        receiver,
        build_event_bus(&options.notifications),
        shutdown_manager,
        shutdown_tx.subscribe(),
    )?;

    info!(
        "Initializing poller for {} projects every {:?}...",
        monitors.aggregate.children().len(),
        options.poller.interval
    );
    let aggregate = Arc::new(Synchronized::new(monitors.aggregate.clone(), dispatcher.clone()));
    shutdown_manager.with_poller(Poller::start(options.poller.clone(), aggregate));

    for server in &monitors.servers {
        info!("Initializing queue poller for '{}'...", server.display_name());
        let server = Arc::new(Synchronized::new(server.clone(), dispatcher.clone()));
        shutdown_manager.with_poller(Poller::start(options.poller.clone(), server));
    }

    Ok(())
}

fn init_event_pump(
    receiver: UnboundedReceiver<MonitorEvent>,
    bus: EventBus,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), MonitorError> {
    info!("Initializing event pump with {} handlers...", bus.len());

    let pump = EventPump::new(receiver, bus);
    let pump_handle = tokio::spawn(async move {
        pump.run(Box::pin(async move {
            let _ = shutdown_rx.recv().await;
        }))
        .await;
    });

    shutdown_manager.with_event_pump_handle(pump_handle)
}

// ================================= ONE SHOT ===================================== //

/// One project line of a single-cycle report
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub snapshot: ProjectSnapshot,
    pub estimated_time_remaining: Option<Duration>,
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone)]
pub struct OnceReport {
    pub state: ProjectState,
    pub summary: String,
    pub projects: Vec<ProjectReport>,
    pub queues: Vec<ViewTree>,
}

/// Poll every configured project and server once
pub async fn poll_once(options: &AppOptions) -> Result<OnceReport, MonitorError> {
    let monitors = build_monitors(options)?;
    login_all(&monitors.connections).await;

    monitors.aggregate.poll().await;

    let mut queues = Vec::with_capacity(monitors.servers.len());
    for server in &monitors.servers {
        server.poll().await;

        let view = SnapshotView::new(server.clone());
        match view.refresh().await {
            RefreshOutcome::Loaded { .. } => queues.push(view.tree()),
            RefreshOutcome::Failed(e) => warn!("No queues for '{}': {}", server.display_name(), e),
            RefreshOutcome::Skipped => {}
        }
    }

    logout_all(&monitors.connections).await;

    let projects = monitors
        .aggregate
        .children()
        .iter()
        .filter_map(|child| {
            child.snapshot().map(|snapshot| ProjectReport {
                snapshot,
                estimated_time_remaining: child.estimated_time_remaining(),
            })
        })
        .collect();

    Ok(OnceReport {
        state: monitors.aggregate.project_state(),
        summary: monitors.aggregate.summary_status(),
        projects,
        queues,
    })
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    pollers: Vec<Poller>,
    event_pump_handle: Option<JoinHandle<()>>,
    connections: Vec<Arc<ServerConnection>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            pollers: Vec::new(),
            event_pump_handle: None,
            connections: Vec::new(),
        }
    }

    pub fn with_poller(&mut self, poller: Poller) {
        self.pollers.push(poller);
    }

    pub fn with_connections(&mut self, connections: Vec<Arc<ServerConnection>>) {
        self.connections = connections;
    }

    pub fn with_event_pump_handle(&mut self, handle: JoinHandle<()>) -> Result<(), MonitorError> {
        if self.event_pump_handle.is_some() {
            return Err(MonitorError::ShutdownError("event_pump_handle already set".to_string()));
        }
        self.event_pump_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), MonitorError> {
        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(MonitorError::ShutdownError(format!(
                    "timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), MonitorError> {
        info!("Shutting down build monitor...");

        // 1. Pollers, so no new events are raised
        for mut poller in self.pollers.drain(..) {
            poller.stop().await?;
        }

        // 2. Event pump, after flushing what the pollers queued
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.event_pump_handle.take() {
            handle.await.map_err(|e| MonitorError::ShutdownError(e.to_string()))?;
        }

        // 3. Server sessions
        logout_all(&self.connections).await;

        info!("Shutdown complete");
        Ok(())
    }
}

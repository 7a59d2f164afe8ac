//! Application configuration options

use std::time::Duration;

use crate::storage::settings::{NotificationSettings, ProjectSettings, ServerSettings, Settings};
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Name of the monitor aggregating every project
    pub aggregate_name: String,

    /// Poller worker options
    pub poller: poller::Options,

    /// Timeout of each request to a build server
    pub request_timeout: Duration,

    pub servers: Vec<ServerSettings>,

    pub projects: Vec<ProjectSettings>,

    pub notifications: NotificationSettings,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            aggregate_name: "All projects".to_string(),
            poller: poller::Options::default(),
            request_timeout: Duration::from_secs(30),
            servers: Vec::new(),
            projects: Vec::new(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poller: poller::Options {
                interval: Duration::from_secs(settings.polling_interval_secs),
            },
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            servers: settings.servers.clone(),
            projects: settings.projects.clone(),
            notifications: settings.notifications.clone(),
            ..Default::default()
        }
    }

    /// Settings of the server at `url`, when it is listed
    pub fn server(&self, url: &str) -> Option<&ServerSettings> {
        self.servers.iter().find(|s| s.url == url)
    }
}

/// Lifecycle options for the monitor
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

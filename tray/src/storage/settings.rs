//! Settings file management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::MonitorError;
use crate::logs::LogLevel;
use crate::notify::TransitionTable;
use crate::status::BuildTransition;

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for rolling log files; no file logging when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Polling interval in seconds
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Timeout of each request to a build server, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Build servers, each polled for its integration queues
    #[serde(default)]
    pub servers: Vec<ServerSettings>,

    /// Projects aggregated into the overall status
    #[serde(default)]
    pub projects: Vec<ProjectSettings>,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_true() -> bool {
    true
}

fn default_polling_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            polling_interval_secs: default_polling_interval(),
            request_timeout_secs: default_request_timeout(),
            servers: Vec::new(),
            projects: Vec::new(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, MonitorError> {
        debug!("Reading settings from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<(), MonitorError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.polling_interval_secs == 0 {
            return Err(MonitorError::ConfigError(
                "polling_interval_secs must be at least 1".to_string(),
            ));
        }
        for project in &self.projects {
            if project.project_name.is_empty() {
                return Err(MonitorError::ConfigError(format!(
                    "Project on {} has no name",
                    project.server_url
                )));
            }
        }
        Ok(())
    }
}

/// One build server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub url: String,

    /// Name shown for the server; the URL when empty
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Poll the server's integration queues
    #[serde(default = "default_true")]
    pub watch_queues: bool,
}

impl ServerSettings {
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.url
        } else {
            &self.display_name
        }
    }
}

/// One monitored project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub server_url: String,
    pub project_name: String,
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Show balloon messages
    #[serde(default = "default_true")]
    pub show_balloons: bool,

    /// Program used to play sound files; platform default when unset
    #[serde(default)]
    pub sound_player: Option<String>,

    #[serde(default)]
    pub sounds: PerTransition<PathBuf>,

    #[serde(default)]
    pub commands: PerTransition<String>,

    #[serde(default = "default_messages")]
    pub messages: PerTransition<Vec<String>>,
}

fn default_messages() -> PerTransition<Vec<String>> {
    PerTransition {
        broken: Some(vec![BuildTransition::Broken.default_message().to_string()]),
        fixed: Some(vec![BuildTransition::Fixed.default_message().to_string()]),
        still_failing: Some(vec![BuildTransition::StillFailing.default_message().to_string()]),
        still_successful: Some(vec![BuildTransition::StillSuccessful.default_message().to_string()]),
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            show_balloons: true,
            sound_player: None,
            sounds: PerTransition::default(),
            commands: PerTransition::default(),
            messages: default_messages(),
        }
    }
}

/// One optional value per build transition, as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTransition<T> {
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub broken: Option<T>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub fixed: Option<T>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub still_failing: Option<T>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub still_successful: Option<T>,
}

impl<T> Default for PerTransition<T> {
    fn default() -> Self {
        Self {
            broken: None,
            fixed: None,
            still_failing: None,
            still_successful: None,
        }
    }
}

impl<T: Clone> PerTransition<T> {
    pub fn to_table(&self) -> TransitionTable<T> {
        TransitionTable::from_fn(|transition| {
            let entry = match transition {
                BuildTransition::Broken => &self.broken,
                BuildTransition::Fixed => &self.fixed,
                BuildTransition::StillFailing => &self.still_failing,
                BuildTransition::StillSuccessful => &self.still_successful,
            };
            entry.clone()
        })
    }
}

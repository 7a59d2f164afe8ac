//! Error types for the build monitor

use thiserror::Error;

/// Main error type for the build monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Project '{0}' not found on server")]
    ProjectNotFound(String),

    #[error("Sound error: {0}")]
    SoundError(String),

    #[error("Exec error: {0}")]
    ExecError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Whether the error means the server session expired and a login may help
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, MonitorError::SessionInvalid(_))
    }
}

impl From<anyhow::Error> for MonitorError {
    fn from(err: anyhow::Error) -> Self {
        MonitorError::Internal(err.to_string())
    }
}

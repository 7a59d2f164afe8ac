//! Side-effect sinks used by the notification handlers

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::errors::MonitorError;
use crate::status::ErrorLevel;

#[async_trait]
pub trait SoundPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), MonitorError>;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<(), MonitorError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, caption: &str, message: &str, level: ErrorLevel) -> Result<(), MonitorError>;
}

/// Plays sound files through an external player program
#[derive(Debug, Clone)]
pub struct ExternalSoundPlayer {
    program: String,
}

impl ExternalSoundPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExternalSoundPlayer {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("afplay")
        } else {
            Self::new("aplay")
        }
    }
}

#[async_trait]
impl SoundPlayer for ExternalSoundPlayer {
    async fn play(&self, path: &Path) -> Result<(), MonitorError> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(MonitorError::SoundError(format!(
                "Sound file not found: {}",
                path.display()
            )));
        }

        let status = Command::new(&self.program)
            .arg(path)
            .status()
            .await
            .map_err(|e| MonitorError::SoundError(format!("Failed to start {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(MonitorError::SoundError(format!(
                "{} exited with {} playing {}",
                self.program,
                status,
                path.display()
            )));
        }
        Ok(())
    }
}

/// Runs command lines through the platform shell
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command_line: &str) -> Result<(), MonitorError> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C");
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c");
            c
        };

        let status = command
            .arg(command_line)
            .status()
            .await
            .map_err(|e| MonitorError::ExecError(format!("Failed to run '{}': {}", command_line, e)))?;

        if !status.success() {
            return Err(MonitorError::ExecError(format!(
                "'{}' exited with {}",
                command_line, status
            )));
        }
        Ok(())
    }
}

/// Shows notifications as log records
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn show(&self, caption: &str, message: &str, level: ErrorLevel) -> Result<(), MonitorError> {
        match level {
            ErrorLevel::Info => info!("{}: {}", caption, message),
            ErrorLevel::Warning => warn!("{}: {}", caption, message),
            ErrorLevel::Error => error!("{}: {}", caption, message),
        }
        Ok(())
    }
}

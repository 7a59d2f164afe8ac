//! Event handlers turning build transitions into side effects

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::MonitorError;
use crate::monitor::events::BuildOccurred;
use crate::monitor::MonitorEvent;
use crate::notify::sinks::{CommandRunner, NotificationSink, SoundPlayer};
use crate::notify::table::TransitionTable;
use crate::status::{BuildTransition, ErrorLevel};
use crate::sync::EventHandler;

pub const NO_MESSAGE: &str = "No message available.";

/// Plays the sound configured for a transition
pub struct SoundNotifier {
    sounds: TransitionTable<PathBuf>,
    player: Arc<dyn SoundPlayer>,
}

impl SoundNotifier {
    pub fn new(sounds: TransitionTable<PathBuf>, player: Arc<dyn SoundPlayer>) -> Self {
        Self { sounds, player }
    }
}

#[async_trait]
impl EventHandler for SoundNotifier {
    fn name(&self) -> &str {
        "sound"
    }

    async fn handle(&self, event: &MonitorEvent) -> Result<(), MonitorError> {
        let Some(build) = event.as_build_occurred() else {
            return Ok(());
        };
        let Some(path) = self.sounds.get(build.transition) else {
            return Ok(());
        };

        debug!("Playing {} for {} on '{}'", path.display(), build.transition, build.source);
        self.player.play(path).await
    }
}

/// Runs the command configured for a transition
pub struct ExecNotifier {
    commands: TransitionTable<String>,
    runner: Arc<dyn CommandRunner>,
}

impl ExecNotifier {
    pub fn new(commands: TransitionTable<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { commands, runner }
    }
}

#[async_trait]
impl EventHandler for ExecNotifier {
    fn name(&self) -> &str {
        "exec"
    }

    async fn handle(&self, event: &MonitorEvent) -> Result<(), MonitorError> {
        let Some(build) = event.as_build_occurred() else {
            return Ok(());
        };
        let Some(command_line) = self.commands.get(build.transition) else {
            return Ok(());
        };

        debug!("Running '{}' for {} on '{}'", command_line, build.transition, build.source);
        self.runner.run(command_line).await
    }
}

/// Shows a balloon for every completed build and every server message.
///
/// Messages configured for a transition are used in turn.
pub struct BalloonNotifier {
    messages: TransitionTable<Vec<String>>,
    cursors: [AtomicUsize; 4],
    sink: Arc<dyn NotificationSink>,
}

impl BalloonNotifier {
    pub fn new(messages: TransitionTable<Vec<String>>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            messages,
            cursors: Default::default(),
            sink,
        }
    }

    /// Next message for `transition`, `None` when nothing is configured
    pub fn next_message(&self, transition: BuildTransition) -> Option<String> {
        let messages = self.messages.get(transition)?;
        if messages.is_empty() {
            return Some(NO_MESSAGE.to_string());
        }

        let turn = self.cursors[transition.ordinal()].fetch_add(1, Ordering::Relaxed);
        Some(messages[turn % messages.len()].clone())
    }

    async fn show_build(&self, build: &BuildOccurred) -> Result<(), MonitorError> {
        let Some(message) = self.next_message(build.transition) else {
            return Ok(());
        };

        let caption = format!("{}: {}", build.status.name, build.transition.caption());
        self.sink
            .show(&caption, &message, build.transition.error_level())
            .await
    }
}

#[async_trait]
impl EventHandler for BalloonNotifier {
    fn name(&self) -> &str {
        "balloon"
    }

    async fn handle(&self, event: &MonitorEvent) -> Result<(), MonitorError> {
        match event {
            MonitorEvent::BuildOccurred(build) => self.show_build(build).await,
            MonitorEvent::MessageReceived(received) => {
                self.sink
                    .show(&received.project_name, &received.message.text, ErrorLevel::Info)
                    .await
            }
            _ => Ok(()),
        }
    }
}

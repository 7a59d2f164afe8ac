//! Build notifications: sounds, external commands and balloon messages

pub mod handlers;
pub mod sinks;
pub mod table;

pub use handlers::{BalloonNotifier, ExecNotifier, SoundNotifier};
pub use sinks::{CommandRunner, ExternalSoundPlayer, LogNotificationSink, NotificationSink, ShellCommandRunner, SoundPlayer};
pub use table::TransitionTable;

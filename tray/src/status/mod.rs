//! Build status model

pub mod item;
pub mod queue;
pub mod snapshot;
pub mod state;
pub mod transition;

pub use item::{ItemBuildStatus, StatusItem};
pub use queue::{QueueSetSnapshot, QueueSnapshot, QueuedRequestSnapshot, ServerSnapshot};
pub use snapshot::{Message, ProjectSnapshot, ProjectStatus};
pub use state::{IntegrationStatus, ProjectActivity, ProjectState};
pub use transition::{BuildTransition, ErrorLevel, PollInterval};

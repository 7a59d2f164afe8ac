//! Hierarchical status items retrieved for detailed status views

use serde::{Deserialize, Serialize};

/// Status of one item in a detailed build snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemBuildStatus {
    #[default]
    Unknown,
    Pending,
    Running,
    CompletedSuccess,
    CompletedFailed,
    Cancelled,
}

impl ItemBuildStatus {
    /// Progress shown for the item, in percent
    pub fn progress(&self) -> u8 {
        match self {
            ItemBuildStatus::CompletedSuccess
            | ItemBuildStatus::CompletedFailed
            | ItemBuildStatus::Cancelled => 100,
            ItemBuildStatus::Running => 50,
            ItemBuildStatus::Unknown | ItemBuildStatus::Pending => 0,
        }
    }
}

/// A node of a fetched status tree.
///
/// `identifier` is stable across fetches and derived from what the item
/// represents, never from its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusItem {
    pub identifier: String,
    pub name: String,

    #[serde(default)]
    pub status: ItemBuildStatus,

    #[serde(default)]
    pub children: Vec<StatusItem>,
}

impl StatusItem {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, status: ItemBuildStatus) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            status,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: StatusItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<StatusItem>) -> Self {
        self.children = children;
        self
    }
}

//! View models fed by monitor snapshots

pub mod builders;
pub mod refresh;
pub mod tree;

pub use refresh::{RefreshGate, RefreshOutcome, SnapshotSource, SnapshotView};
pub use tree::{reconcile, Reconciliation, TreeDiff, ViewNode, ViewTree};

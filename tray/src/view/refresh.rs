//! User-triggered snapshot refreshes, one at a time per view

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::MonitorError;
use crate::status::StatusItem;
use crate::view::tree::{TreeDiff, ViewTree};

/// Anything that can produce a detailed status tree on demand
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError>;
}

/// Admits one refresh at a time
#[derive(Debug, Default)]
pub struct RefreshGate {
    in_flight: AtomicBool,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another permit is alive
    pub fn try_acquire(&self) -> Option<RefreshPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped
#[derive(Debug)]
pub struct RefreshPermit<'a> {
    gate: &'a RefreshGate,
}

impl Drop for RefreshPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Another refresh of the same view was still running
    Skipped,
    Loaded { diff: TreeDiff, elapsed: Duration },
    /// The tree was left as it was
    Failed(MonitorError),
}

/// A tree view fed by a [`SnapshotSource`]
pub struct SnapshotView<S: ?Sized> {
    source: Arc<S>,
    gate: RefreshGate,
    tree: Mutex<ViewTree>,
}

impl<S> SnapshotView<S>
where
    S: SnapshotSource + ?Sized,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            gate: RefreshGate::new(),
            tree: Mutex::new(ViewTree::new()),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_in_flight()
    }

    pub fn tree(&self) -> ViewTree {
        self.tree.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run `f` against the current tree, e.g. to change selection
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut ViewTree) -> R) -> R {
        let mut tree = self.tree.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut tree)
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_permit) = self.gate.try_acquire() else {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        let started = Instant::now();
        match self.source.retrieve_snapshot().await {
            Ok(root) => {
                let diff = self.with_tree(|tree| tree.apply(std::slice::from_ref(&root)));
                let elapsed = started.elapsed();
                debug!(
                    "Refreshed '{}' in {:?}: {} created, {} updated, {} removed",
                    root.identifier,
                    elapsed,
                    diff.created.len(),
                    diff.updated.len(),
                    diff.removed.len()
                );
                RefreshOutcome::Loaded { diff, elapsed }
            }
            Err(e) => {
                warn!("Snapshot refresh failed: {}", e);
                RefreshOutcome::Failed(e)
            }
        }
    }
}

//! Status tree reconciliation and snapshot view tests

mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use buildtray::errors::MonitorError;
use buildtray::monitor::{AggregatingMonitor, Monitor, ProjectMonitor, ProjectMonitorExt};
use buildtray::status::{ItemBuildStatus, ProjectActivity, QueueSetSnapshot, QueueSnapshot, QueuedRequestSnapshot, StatusItem};
use buildtray::view::builders::queue_set_item;
use buildtray::view::{reconcile, RefreshOutcome, SnapshotSource, SnapshotView, ViewTree};

use common::{connection_error, failure, success, ScriptedProjectSource};

fn item(id: &str, status: ItemBuildStatus) -> StatusItem {
    StatusItem::new(id, format!("Item {}", id), status)
}

fn ids(tree: &ViewTree) -> Vec<&str> {
    tree.roots().iter().map(|n| n.id.as_str()).collect()
}

// ================================ RECONCILE ===================================== //

#[test]
fn test_selection_survives_reconciliation() {
    let mut tree = ViewTree::new();
    tree.apply(&[
        item("A", ItemBuildStatus::Pending),
        item("B", ItemBuildStatus::Pending),
        item("C", ItemBuildStatus::Pending),
    ]);
    assert!(tree.set_selected("B"));

    let diff = tree.apply(&[
        item("B", ItemBuildStatus::Running),
        item("C", ItemBuildStatus::Pending),
        item("D", ItemBuildStatus::Pending),
    ]);

    assert_eq!(diff.created, vec!["D".to_string()]);
    assert_eq!(diff.updated, vec!["B".to_string(), "C".to_string()]);
    assert_eq!(diff.removed, vec!["A".to_string()]);

    let selected = tree.selected().unwrap();
    assert_eq!(selected.id, "B");
    assert_eq!(selected.status, ItemBuildStatus::Running);
    assert_eq!(ids(&tree), vec!["B", "C", "D"]);
}

#[test]
fn test_reconciliation_is_idempotent() {
    let snapshot = vec![
        item("A", ItemBuildStatus::Pending).with_child(item("A1", ItemBuildStatus::Running)),
        item("B", ItemBuildStatus::CompletedFailed),
    ];

    let mut tree = ViewTree::new();
    tree.apply(&snapshot);
    assert!(tree.set_expanded("A", false));
    assert!(tree.set_selected("A1"));
    let before = tree.clone();

    let diff = tree.apply(&snapshot);

    assert_eq!(tree, before);
    assert!(diff.is_structurally_unchanged());
    assert_eq!(diff.updated.len(), 3);
    assert!(!tree.find("A").unwrap().expanded);
}

#[test]
fn test_order_follows_the_snapshot() {
    let previous = reconcile(
        &[],
        &[item("A", ItemBuildStatus::Pending), item("B", ItemBuildStatus::Pending)],
    );
    let next = reconcile(
        &previous.nodes,
        &[item("B", ItemBuildStatus::Pending), item("A", ItemBuildStatus::Pending)],
    );

    let order: Vec<_> = next.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(order, vec!["B", "A"]);
    assert!(next.diff.is_structurally_unchanged());
}

#[test]
fn test_labels_follow_the_snapshot() {
    let previous = reconcile(&[], &[StatusItem::new("A", "old", ItemBuildStatus::Pending)]);
    let next = reconcile(&previous.nodes, &[StatusItem::new("A", "new", ItemBuildStatus::CompletedSuccess)]);

    assert_eq!(next.nodes[0].label, "new");
    assert_eq!(next.nodes[0].status, ItemBuildStatus::CompletedSuccess);
}

#[test]
fn test_same_id_on_different_levels() {
    let snapshot = [item("X", ItemBuildStatus::Pending).with_child(item("X", ItemBuildStatus::Running))];

    let mut tree = ViewTree::new();
    tree.apply(&snapshot);
    let diff = tree.apply(&snapshot);

    assert_eq!(tree.len(), 2);
    assert_eq!(diff.updated, vec!["X".to_string(), "X".to_string()]);
}

#[test]
fn test_duplicate_identifiers_are_stable() {
    let snapshot = [item("A", ItemBuildStatus::Pending), item("A", ItemBuildStatus::Running)];

    let mut tree = ViewTree::new();
    let first = tree.apply(&snapshot);
    assert_eq!(first.created, vec!["A".to_string(), "A".to_string()]);
    let before = tree.clone();

    let diff = tree.apply(&snapshot);

    assert!(diff.is_structurally_unchanged());
    assert_eq!(diff.updated, vec!["A".to_string(), "A".to_string()]);
    assert_eq!(tree, before);
    assert_eq!(tree.roots()[1].status, ItemBuildStatus::Running);
}

#[test]
fn test_empty_snapshot_removes_everything() {
    let mut tree = ViewTree::new();
    tree.apply(&[item("A", ItemBuildStatus::Pending).with_child(item("A1", ItemBuildStatus::Pending))]);

    let diff = tree.apply(&[]);

    assert!(tree.is_empty());
    assert!(tree.selected().is_none());
    assert_eq!(diff.removed, vec!["A".to_string(), "A1".to_string()]);
}

#[test]
fn test_queue_tree_keeps_selection_across_polls() {
    let queue = |requests: &[&str]| {
        let queue = requests.iter().fold(QueueSnapshot::new("main"), |q, name| {
            q.with_request(QueuedRequestSnapshot::new(*name, ProjectActivity::Pending))
        });
        QueueSetSnapshot::new(vec![queue])
    };

    let mut tree = ViewTree::new();
    tree.apply(&[queue_set_item("ci", &queue(&["core", "docs"]))]);
    assert_eq!(tree.selected().map(|n| n.id.as_str()), Some("server:ci"));
    assert!(tree.set_selected("queue:ci/main/docs"));

    let diff = tree.apply(&[queue_set_item("ci", &queue(&["docs"]))]);

    assert_eq!(diff.removed, vec!["queue:ci/main/core".to_string()]);
    assert_eq!(tree.selected().map(|n| n.id.as_str()), Some("queue:ci/main/docs"));
    assert_eq!(tree.find("queue:ci/main").map(|n| n.label.as_str()), Some("main (1)"));
}

// =============================== SNAPSHOT VIEW ================================== //

#[tokio::test]
async fn test_aggregate_view_follows_polls() {
    let aggregate = Arc::new(AggregatingMonitor::new(
        "all",
        vec![
            Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::new(
                "core",
                vec![Ok(success("core", 0)), Ok(failure("core", 1))],
            )))) as Arc<dyn ProjectMonitorExt>,
            Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::always(
                success("docs", 0).with_label("42"),
            )))),
        ],
    ));
    let view = SnapshotView::new(aggregate.clone());

    aggregate.poll().await;
    assert!(matches!(view.refresh().await, RefreshOutcome::Loaded { .. }));
    let tree = view.tree();
    let root = &tree.roots()[0];
    assert_eq!(root.id, "aggregate:all");
    assert_eq!(root.status, ItemBuildStatus::CompletedSuccess);
    assert_eq!(root.children[0].id, "project:core");
    assert_eq!(root.children[1].label, "docs [Success] 42");
    assert!(view.with_tree(|tree| tree.set_selected("project:core")));

    aggregate.poll().await;
    let RefreshOutcome::Loaded { diff, .. } = view.refresh().await else {
        panic!("expected the refresh to load");
    };
    assert!(diff.is_structurally_unchanged());

    let tree = view.tree();
    let core = tree.selected().unwrap();
    assert_eq!(core.id, "project:core");
    assert_eq!(core.status, ItemBuildStatus::CompletedFailed);
    assert_eq!(tree.roots()[0].status, ItemBuildStatus::CompletedFailed);
}

/// Source that blocks each fetch until released
struct GatedSource {
    release: Notify,
    fetches: AtomicUsize,
    results: Mutex<VecDeque<Result<StatusItem, MonitorError>>>,
}

impl GatedSource {
    fn new(results: Vec<Result<StatusItem, MonitorError>>) -> Self {
        Self {
            release: Notify::new(),
            fetches: AtomicUsize::new(0),
            results: Mutex::new(results.into()),
        }
    }
}

#[async_trait]
impl SnapshotSource for GatedSource {
    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.results.lock().unwrap().pop_front().unwrap_or_else(|| Err(connection_error()))
    }
}

#[tokio::test]
async fn test_refresh_is_single_flight() {
    let source = Arc::new(GatedSource::new(vec![Ok(item("root", ItemBuildStatus::Running))]));
    let view = SnapshotView::new(source.clone());

    let (first, second) = tokio::join!(view.refresh(), async {
        assert!(view.is_refreshing());
        let second = view.refresh().await;
        source.release.notify_one();
        second
    });

    assert!(matches!(second, RefreshOutcome::Skipped));
    let RefreshOutcome::Loaded { diff, .. } = first else {
        panic!("expected the first refresh to load");
    };
    assert_eq!(diff.created, vec!["root".to_string()]);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert!(!view.is_refreshing());
}

#[tokio::test]
async fn test_failed_refresh_keeps_the_tree() {
    let source = Arc::new(GatedSource::new(vec![
        Ok(item("root", ItemBuildStatus::Running).with_child(item("leaf", ItemBuildStatus::Pending))),
        Err(MonitorError::SessionInvalid("expired".to_string())),
    ]));
    let view = SnapshotView::new(source.clone());

    source.release.notify_one();
    assert!(matches!(view.refresh().await, RefreshOutcome::Loaded { .. }));
    assert!(view.with_tree(|tree| tree.set_selected("leaf")));
    let before = view.tree();

    source.release.notify_one();
    let outcome = view.refresh().await;

    assert!(matches!(outcome, RefreshOutcome::Failed(MonitorError::SessionInvalid(_))));
    assert_eq!(view.tree(), before);
    assert!(!view.is_refreshing());

    // The gate is free again after a failure
    source.release.notify_one();
    assert!(matches!(view.refresh().await, RefreshOutcome::Failed(_)));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
}

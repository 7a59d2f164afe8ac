//! Project, server, aggregate and synchronized monitor tests

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};

use buildtray::errors::MonitorError;
use buildtray::monitor::{
    AggregatingMonitor, Monitor, MonitorEvent, ProjectCommand, ProjectMonitor, ProjectMonitorExt, ServerMonitor,
    ServerMonitorExt,
};
use buildtray::status::{
    BuildTransition, IntegrationStatus, ItemBuildStatus, ProjectActivity, ProjectState, QueueSetSnapshot,
    QueueSnapshot, QueuedRequestSnapshot, ServerSnapshot, StatusItem,
};
use buildtray::sync::{self, Synchronized};
use buildtray::view::SnapshotSource;

use common::{
    building, connection_error, failure, kinds, success, PanickingProjectSource, ScriptedProjectSource,
    ScriptedServerSource,
};

fn child(source: ScriptedProjectSource) -> Arc<dyn ProjectMonitorExt> {
    Arc::new(ProjectMonitor::new(Arc::new(source)))
}

fn polled_count(events: &[MonitorEvent]) -> usize {
    events.iter().filter(|e| e.as_polled().is_some()).count()
}

// ================================ AGGREGATE ================================== //

#[tokio::test]
async fn test_aggregate_state_is_worst_child() {
    let aggregate = AggregatingMonitor::new(
        "all",
        vec![
            child(ScriptedProjectSource::always(success("p1", 0))),
            child(ScriptedProjectSource::always(failure("p2", 0))),
            child(ScriptedProjectSource::always(building("p3", IntegrationStatus::Success, 0))),
        ],
    );

    aggregate.poll().await;
    assert_eq!(aggregate.project_state(), ProjectState::Broken);
    assert_eq!(aggregate.integration_status(), IntegrationStatus::Failure);
    assert_eq!(aggregate.summary_status(), "p2: Broken\np3: Building");
}

#[tokio::test]
async fn test_aggregate_state_ignores_child_order() {
    let statuses = [
        success("p1", 0),
        failure("p2", 0),
        building("p3", IntegrationStatus::Success, 0),
    ];
    let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];

    for order in orders {
        let children = order
            .iter()
            .map(|&i| child(ScriptedProjectSource::always(statuses[i].clone())))
            .collect();
        let aggregate = AggregatingMonitor::new("all", children);
        aggregate.poll().await;
        assert_eq!(aggregate.project_state(), ProjectState::Broken, "order {:?}", order);
    }
}

#[tokio::test]
async fn test_failing_children_do_not_stop_the_cycle() {
    let healthy_a = Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::always(success("a", 0)))));
    let healthy_b = Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::always(success("b", 0)))));

    let aggregate = AggregatingMonitor::new(
        "all",
        vec![
            child(ScriptedProjectSource::failing("down-1")),
            healthy_a.clone() as Arc<dyn ProjectMonitorExt>,
            Arc::new(ProjectMonitor::new(Arc::new(PanickingProjectSource {
                name: "panics".to_string(),
            }))),
            child(ScriptedProjectSource::failing("down-2")),
            healthy_b.clone() as Arc<dyn ProjectMonitorExt>,
        ],
    );

    let events = aggregate.poll().await;
    assert_eq!(polled_count(&events), 1);
    assert_eq!(events.len(), 1);

    assert_eq!(healthy_a.project_state(), ProjectState::Success);
    assert_eq!(healthy_b.project_state(), ProjectState::Success);
    assert!(healthy_a.is_connected() && healthy_b.is_connected());
    assert_eq!(aggregate.project_state(), ProjectState::NotConnected);

    let Some(polled) = events[0].as_polled() else {
        panic!("expected a polled event");
    };
    assert_eq!(polled.source, "all");
    assert_eq!(polled.sequence, 1);
}

#[tokio::test]
async fn test_aggregate_forwards_most_important_build() {
    let aggregate = AggregatingMonitor::new(
        "all",
        vec![
            child(ScriptedProjectSource::new("fixed", vec![Ok(failure("fixed", 0)), Ok(success("fixed", 1))])),
            child(ScriptedProjectSource::new("broken", vec![Ok(success("broken", 0)), Ok(failure("broken", 1))])),
            child(ScriptedProjectSource::new("also-broken", vec![Ok(success("also-broken", 0)), Ok(failure("also-broken", 1))])),
        ],
    );

    aggregate.poll().await;
    let events = aggregate.poll().await;

    let builds: Vec<_> = events.iter().filter_map(MonitorEvent::as_build_occurred).collect();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].source, "broken");
    assert_eq!(builds[0].transition, BuildTransition::Broken);
    assert_eq!(kinds(&events), vec!["polled", "build_occurred"]);
}

#[tokio::test]
async fn test_aggregate_commands_unsupported() {
    let aggregate = AggregatingMonitor::new("all", vec![child(ScriptedProjectSource::always(success("a", 0)))]);
    aggregate.poll().await;

    assert_eq!(aggregate.summary_status(), "All builds are good");
    assert!(aggregate.snapshot().is_none());
    assert_eq!(aggregate.child_snapshots().len(), 1);
    assert!(matches!(aggregate.force_build().await, Err(MonitorError::Unsupported(_))));
    assert!(matches!(aggregate.fix_build("fred").await, Err(MonitorError::Unsupported(_))));
}

#[tokio::test]
async fn test_empty_aggregate() {
    let aggregate = AggregatingMonitor::new("none", Vec::new());
    let events = aggregate.poll().await;

    assert_eq!(polled_count(&events), 1);
    assert_eq!(aggregate.project_state(), ProjectState::Success);
    assert!(!aggregate.is_pending());
}

// ============================== PROJECT COMMANDS ================================= //

#[tokio::test]
async fn test_commands_pass_through() {
    let source = Arc::new(ScriptedProjectSource::always(success("core", 0)));
    let monitor = ProjectMonitor::new(source.clone());

    assert_ok!(monitor.force_build().await);
    assert_ok!(monitor.stop_project().await);
    assert_ok!(monitor.fix_build("fred").await);

    assert_eq!(
        source.executed(),
        vec![
            ProjectCommand::ForceBuild,
            ProjectCommand::StopProject,
            ProjectCommand::FixBuild {
                user_name: "fred".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_command_errors_propagate() {
    let source = Arc::new(
        ScriptedProjectSource::always(success("core", 0))
            .with_command_results(vec![Err(MonitorError::CommandError("project is stopped".to_string()))]),
    );
    let monitor = ProjectMonitor::new(source.clone());

    let result = monitor.abort_build().await;
    assert!(matches!(result, Err(MonitorError::CommandError(_))));
    assert_eq!(source.session_refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_session_is_retried_once() {
    let source = Arc::new(
        ScriptedProjectSource::always(success("core", 0))
            .with_command_results(vec![Err(MonitorError::SessionInvalid("expired".to_string())), Ok(())]),
    );
    let monitor = ProjectMonitor::new(source.clone());

    assert_ok!(monitor.start_project().await);
    assert_eq!(source.session_refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(source.executed().len(), 2);
}

#[tokio::test]
async fn test_expired_session_without_login() {
    let source = Arc::new(
        ScriptedProjectSource::always(success("core", 0))
            .with_command_results(vec![Err(MonitorError::SessionInvalid("expired".to_string()))])
            .with_refresh_succeeding(false),
    );
    let monitor = ProjectMonitor::new(source.clone());

    let result = monitor.cancel_pending().await;
    assert!(matches!(result, Err(MonitorError::SessionInvalid(_))));
    assert_eq!(source.executed().len(), 1);
}

#[tokio::test]
async fn test_project_snapshot_source() {
    let item = StatusItem::new("core", "core", ItemBuildStatus::Running);
    let monitor = ProjectMonitor::new(Arc::new(
        ScriptedProjectSource::always(success("core", 0)).with_snapshot(item.clone()),
    ));

    assert_eq!(assert_ok!(monitor.retrieve_snapshot().await), item);
}

// ================================== SERVER ====================================== //

fn server_snapshot(projects: &[&str], queued: &[&str]) -> ServerSnapshot {
    let queue = queued.iter().fold(QueueSnapshot::new("main"), |q, name| {
        q.with_request(QueuedRequestSnapshot::new(*name, ProjectActivity::Pending))
    });
    ServerSnapshot {
        projects: projects.iter().map(|name| success(name, 0)).collect(),
        queue_set: QueueSetSnapshot::new(vec![queue]),
    }
}

#[tokio::test]
async fn test_server_monitor_events() {
    let source = Arc::new(ScriptedServerSource::new(
        "ci",
        vec![
            Ok(server_snapshot(&["a", "b"], &[])),
            Ok(server_snapshot(&["a", "b"], &[])),
            Ok(server_snapshot(&["a", "b"], &["a"])),
            Ok(server_snapshot(&["b", "c"], &["a"])),
            Err(connection_error()),
        ],
    ));
    let server = ServerMonitor::new(source.clone());

    assert_eq!(kinds(&server.poll().await), vec!["polled", "queue_changed"]);
    assert_eq!(kinds(&server.poll().await), vec!["polled"]);
    assert_eq!(kinds(&server.poll().await), vec!["polled", "queue_changed"]);

    let events = server.poll().await;
    assert_eq!(kinds(&events), vec!["polled", "server_snapshot_changed"]);
    let MonitorEvent::ServerSnapshotChanged(changed) = &events[1] else {
        panic!("expected a project set change");
    };
    assert_eq!(changed.added, vec!["c".to_string()]);
    assert_eq!(changed.removed, vec!["a".to_string()]);

    let events = server.poll().await;
    assert_eq!(kinds(&events), vec!["polled", "queue_changed"]);
    let MonitorEvent::QueueChanged(queue_changed) = &events[1] else {
        panic!("expected a queue change");
    };
    assert!(queue_changed.queue_set.is_none());
    assert!(!server.is_connected());
    assert!(server.connect_error().is_some());

    assert_eq!(source.invalidations.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_server_project_lookup() {
    let server = ServerMonitor::new(Arc::new(ScriptedServerSource::new(
        "ci",
        vec![Ok(server_snapshot(&["a"], &["a"]))],
    )));

    assert_eq!(assert_ok!(server.project_status("a")), None);

    server.poll().await;
    assert!(server.is_connected());
    assert_eq!(
        assert_ok!(server.project_status("a")).map(|p| p.name),
        Some("a".to_string())
    );
    assert!(matches!(server.project_status("zzz"), Err(MonitorError::ProjectNotFound(_))));

    let queue_set = server.queue_set().unwrap();
    assert_eq!(queue_set.find_by_name("main").and_then(|q| q.head()).map(|r| r.project_name.as_str()), Some("a"));

    let tree = assert_ok!(server.retrieve_snapshot().await);
    assert_eq!(tree.identifier, "server:ci");
    assert_eq!(tree.children[0].children.len(), 1);
}

#[tokio::test]
async fn test_server_session_and_cancel() {
    let source = Arc::new(ScriptedServerSource::new("ci", Vec::new()));
    let server = ServerMonitor::new(source.clone());

    assert_eq!(assert_ok!(server.start().await), true);
    assert_ok!(server.refresh_session().await);
    assert_ok!(server.stop().await);
    assert_ok!(server.cancel_pending_request("a").await);

    assert_eq!(source.logins.load(Ordering::SeqCst), 2);
    assert_eq!(source.logouts.load(Ordering::SeqCst), 2);
    assert_eq!(*source.cancelled.lock().unwrap(), vec!["a".to_string()]);

    assert_err!(server.retrieve_snapshot().await);
}

// ================================ SYNCHRONIZED ================================== //

#[tokio::test]
async fn test_synchronized_delivers_in_emission_order() {
    let (dispatcher, mut receiver) = sync::channel();
    let monitor = Synchronized::new(
        Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::always(success("core", 0))))),
        Arc::new(dispatcher),
    );

    for _ in 0..5 {
        monitor.poll().await;
    }

    let mut sequences = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let Some(polled) = event.as_polled() {
            sequences.push(polled.sequence);
        }
    }
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_synchronized_keeps_the_monitor_contract() {
    let (dispatcher, mut receiver) = sync::channel();
    let source = Arc::new(ScriptedProjectSource::new(
        "core",
        vec![Ok(success("core", 0)), Ok(failure("core", 1))],
    ));
    let monitor = Synchronized::new(Arc::new(ProjectMonitor::new(source.clone())), Arc::new(dispatcher));

    monitor.poll().await;
    let returned = monitor.poll().await;
    assert_eq!(monitor.name(), "core");
    assert_eq!(monitor.project_state(), ProjectState::Broken);
    assert_ok!(monitor.force_build().await);
    assert_eq!(source.executed(), vec![ProjectCommand::ForceBuild]);

    let mut delivered = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        delivered.push(event.kind());
    }
    assert_eq!(delivered, vec!["polled", "polled", "build_occurred"]);
    assert_eq!(kinds(&returned), vec!["polled", "build_occurred"]);
}

#[tokio::test]
async fn test_synchronized_server_and_dyn_monitors() {
    let delivered = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = delivered.clone();
    let dispatch = move |event: MonitorEvent| sink.lock().unwrap().push(event.source().to_string());

    let server: Arc<ServerMonitor> = Arc::new(ServerMonitor::new(Arc::new(ScriptedServerSource::new(
        "ci",
        vec![Ok(server_snapshot(&["a"], &[]))],
    ))));
    let server = Synchronized::new(server, Arc::new(dispatch));
    server.poll().await;
    assert!(server.is_connected());

    let (dispatcher, _receiver) = sync::channel();
    let erased: Arc<dyn ProjectMonitorExt> = child(ScriptedProjectSource::always(success("core", 0)));
    let erased = Synchronized::new(erased, Arc::new(dispatcher));
    erased.poll().await;
    assert_eq!(erased.project_state(), ProjectState::Success);

    assert_eq!(*delivered.lock().unwrap(), vec!["ci".to_string(), "ci".to_string()]);
}

#[tokio::test]
async fn test_dispatch_after_consumer_is_gone() {
    let (dispatcher, receiver) = sync::channel();
    drop(receiver);

    let monitor = Synchronized::new(
        Arc::new(ProjectMonitor::new(Arc::new(ScriptedProjectSource::always(success("core", 0))))),
        Arc::new(dispatcher),
    );
    assert_eq!(kinds(&monitor.poll().await), vec!["polled"]);
}

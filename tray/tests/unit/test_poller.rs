//! Poller worker tests

mod common;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_test::assert_ok;

use buildtray::workers::poller::{self, Poller};

use common::CountingMonitor;

fn options(interval_ms: u64) -> poller::Options {
    poller::Options {
        interval: Duration::from_millis(interval_ms),
    }
}

/// Shutdown signal resolving once the monitor reached `polls` polls
fn after_polls(monitor: Arc<CountingMonitor>, polls: usize) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        while monitor.polls() < polls {
            tokio::task::yield_now().await;
        }
    })
}

#[tokio::test]
async fn test_resolved_shutdown_polls_once() {
    let monitor = CountingMonitor::new();

    poller::run(&options(1000), &monitor, |_| async {}, Box::pin(async {})).await;

    assert_eq!(monitor.polls(), 1);
}

#[tokio::test]
async fn test_polls_first_then_sleeps() {
    let monitor = CountingMonitor::new();

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        poller::run(
            &options(1000),
            &monitor,
            |_| futures::future::pending::<()>(),
            Box::pin(futures::future::pending::<()>()),
        ),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(monitor.polls(), 1);
}

#[tokio::test]
async fn test_sleeps_for_the_interval() {
    let monitor = Arc::new(CountingMonitor::new());
    let sleeps = Arc::new(Mutex::new(Vec::new()));

    let recorded = sleeps.clone();
    poller::run(
        &options(250),
        monitor.as_ref(),
        move |duration| {
            recorded.lock().unwrap().push(duration);
            async {}
        },
        after_polls(monitor.clone(), 4),
    )
    .await;

    assert_eq!(monitor.polls(), 4);
    assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_millis(250); 3]);
}

#[tokio::test]
async fn test_panicking_polls_do_not_stop_the_loop() {
    let monitor = Arc::new(CountingMonitor::panicking_on(vec![1, 3]));

    poller::run(&options(1), monitor.as_ref(), |_| async {}, after_polls(monitor.clone(), 5)).await;

    assert_eq!(monitor.polls(), 5);
}

#[tokio::test]
async fn test_spawned_poller_stops() {
    let monitor = Arc::new(CountingMonitor::new());
    let mut poller = Poller::start(options(5), monitor.clone());
    assert!(poller.is_running());

    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while monitor.polls() < 3 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(reached.is_ok());

    assert_ok!(poller.stop().await);
    assert!(!poller.is_running());

    let polls = monitor.polls();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(monitor.polls(), polls);

    // Stopping twice is harmless
    assert_ok!(poller.stop().await);
}

#[tokio::test]
async fn test_custom_sleep_function() {
    let monitor = Arc::new(CountingMonitor::panicking_on(vec![2]));
    let sleeps = Arc::new(Mutex::new(0usize));

    let counted = sleeps.clone();
    let mut poller = Poller::start_with(options(10_000), monitor.clone(), move |_| {
        *counted.lock().unwrap() += 1;
        tokio::time::sleep(Duration::from_millis(1))
    });

    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while monitor.polls() < 4 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(reached.is_ok());
    assert_ok!(poller.stop().await);

    assert!(*sleeps.lock().unwrap() >= 3);
}

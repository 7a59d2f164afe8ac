//! Polling worker driving a monitor on a fixed interval

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::MonitorError;
use crate::monitor::Monitor;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Wait between the end of one poll and the start of the next
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Run the poller worker.
///
/// Polls immediately, then waits `interval` after each completed poll. A
/// panicking poll is logged and the loop continues. Returns once the
/// shutdown signal resolves; an in-flight poll is finished first.
pub async fn run<M, S, F>(
    options: &Options,
    monitor: &M,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    M: Monitor + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Poller worker starting for '{}'...", monitor.name());

    loop {
        debug!("Polling '{}'...", monitor.name());
        match AssertUnwindSafe(monitor.poll()).catch_unwind().await {
            Ok(events) => {
                debug!("Poll of '{}' raised {} events", monitor.name(), events.len());
            }
            Err(_) => {
                error!("Poll of '{}' panicked, will retry next cycle", monitor.name());
            }
        }

        tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                info!("Poller worker for '{}' shutting down...", monitor.name());
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}

/// Handle to a spawned poller worker
pub struct Poller {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn a poller that sleeps on the tokio timer
    pub fn start<M>(options: Options, monitor: Arc<M>) -> Self
    where
        M: Monitor + ?Sized + 'static,
    {
        Self::start_with(options, monitor, tokio::time::sleep)
    }

    /// Spawn a poller with a custom sleep function
    pub fn start_with<M, S, F>(options: Options, monitor: Arc<M>, sleep_fn: S) -> Self
    where
        M: Monitor + ?Sized + 'static,
        S: Fn(Duration) -> F + Send + Sync + 'static,
        F: Future<Output = ()> + Send,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            run(
                &options,
                monitor.as_ref(),
                sleep_fn,
                Box::pin(async move {
                    let _ = shutdown_rx.await;
                }),
            )
            .await;
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Stop the worker. No poll starts after this returns; a poll already in
    /// progress is allowed to finish.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| MonitorError::ShutdownError(e.to_string()))?;
        }
        Ok(())
    }
}

//! Monitor wrapper that redelivers events through a dispatcher

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MonitorError;
use crate::monitor::{Monitor, MonitorEvent, ProjectMonitorExt, ServerMonitorExt};
use crate::status::{IntegrationStatus, ProjectSnapshot, ProjectState, ProjectStatus, QueueSetSnapshot};
use crate::sync::dispatch::Dispatch;

/// Wraps any monitor and hands each event it raises to a dispatcher, in
/// emission order, without waiting for delivery.
///
/// Everything else, including the events returned from `poll`, is the
/// wrapped monitor's own behavior.
pub struct Synchronized<M: ?Sized> {
    inner: Arc<M>,
    dispatcher: Arc<dyn Dispatch>,
}

impl<M: ?Sized> Synchronized<M> {
    pub fn new(inner: Arc<M>, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { inner, dispatcher }
    }

    pub fn inner(&self) -> &Arc<M> {
        &self.inner
    }
}

#[async_trait]
impl<M> Monitor for Synchronized<M>
where
    M: Monitor + ?Sized,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn poll(&self) -> Vec<MonitorEvent> {
        let events = self.inner.poll().await;
        for event in &events {
            self.dispatcher.dispatch(event.clone());
        }
        events
    }
}

#[async_trait]
impl<M> ProjectMonitorExt for Synchronized<M>
where
    M: ProjectMonitorExt + ?Sized,
{
    fn project_state(&self) -> ProjectState {
        self.inner.project_state()
    }

    fn integration_status(&self) -> IntegrationStatus {
        self.inner.integration_status()
    }

    fn summary_status(&self) -> String {
        self.inner.summary_status()
    }

    fn snapshot(&self) -> Option<ProjectSnapshot> {
        self.inner.snapshot()
    }

    fn is_pending(&self) -> bool {
        self.inner.is_pending()
    }

    fn estimated_time_remaining(&self) -> Option<Duration> {
        self.inner.estimated_time_remaining()
    }

    async fn force_build(&self) -> Result<(), MonitorError> {
        self.inner.force_build().await
    }

    async fn abort_build(&self) -> Result<(), MonitorError> {
        self.inner.abort_build().await
    }

    async fn start_project(&self) -> Result<(), MonitorError> {
        self.inner.start_project().await
    }

    async fn stop_project(&self) -> Result<(), MonitorError> {
        self.inner.stop_project().await
    }

    async fn cancel_pending(&self) -> Result<(), MonitorError> {
        self.inner.cancel_pending().await
    }

    async fn fix_build(&self, user_name: &str) -> Result<(), MonitorError> {
        self.inner.fix_build(user_name).await
    }
}

#[async_trait]
impl<M> ServerMonitorExt for Synchronized<M>
where
    M: ServerMonitorExt + ?Sized,
{
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn queue_set(&self) -> Option<QueueSetSnapshot> {
        self.inner.queue_set()
    }

    fn project_status(&self, project_name: &str) -> Result<Option<ProjectStatus>, MonitorError> {
        self.inner.project_status(project_name)
    }

    async fn cancel_pending_request(&self, project_name: &str) -> Result<(), MonitorError> {
        self.inner.cancel_pending_request(project_name).await
    }
}

//! Consumer side of dispatched events

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::errors::MonitorError;
use crate::monitor::MonitorEvent;

/// Reacts to monitor events on the consuming context
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &MonitorEvent) -> Result<(), MonitorError>;
}

/// Ordered set of handlers. A failing or panicking handler is logged and
/// never keeps the event from the others.
#[derive(Default, Clone)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        debug!("Subscribing handler '{}'", handler.name());
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn publish(&self, event: &MonitorEvent) {
        for handler in &self.handlers {
            match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        "Handler '{}' failed on {} from '{}': {}",
                        handler.name(),
                        event.kind(),
                        event.source(),
                        e
                    );
                }
                Err(_) => {
                    error!("Handler '{}' panicked on {}", handler.name(), event.kind());
                }
            }
        }
    }
}

/// Moves events from a dispatcher channel to an [`EventBus`]
pub struct EventPump {
    receiver: UnboundedReceiver<MonitorEvent>,
    bus: EventBus,
}

impl EventPump {
    pub fn new(receiver: UnboundedReceiver<MonitorEvent>, bus: EventBus) -> Self {
        Self { receiver, bus }
    }

    /// Publish every event already queued. Returns how many were handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.bus.publish(&event).await;
            handled += 1;
        }
        handled
    }

    /// Publish events until shutdown or until every dispatcher is dropped.
    /// Events still queued at shutdown are published before returning.
    pub async fn run(mut self, mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>) {
        info!("Event pump starting...");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_signal => {
                    let remaining = self.drain().await;
                    info!("Event pump shutting down ({} queued events flushed)...", remaining);
                    return;
                }
                event = self.receiver.recv() => {
                    match event {
                        Some(event) => self.bus.publish(&event).await,
                        None => {
                            info!("All dispatchers dropped, event pump stopping...");
                            return;
                        }
                    }
                }
            }
        }
    }
}

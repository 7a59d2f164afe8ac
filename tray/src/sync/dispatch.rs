//! Handing events over to the consuming context

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::monitor::MonitorEvent;

/// Delivers an event to the context that owns its consumers.
///
/// Must return without waiting for the event to be consumed, and must keep
/// the order of events dispatched from one caller.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, event: MonitorEvent);
}

impl<F> Dispatch for F
where
    F: Fn(MonitorEvent) + Send + Sync,
{
    fn dispatch(&self, event: MonitorEvent) {
        self(event)
    }
}

/// Dispatcher backed by an unbounded channel; the consumer pulls from the
/// receiving end on its own schedule.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: UnboundedSender<MonitorEvent>,
}

impl ChannelDispatcher {
    pub fn new(sender: UnboundedSender<MonitorEvent>) -> Self {
        Self { sender }
    }
}

impl Dispatch for ChannelDispatcher {
    fn dispatch(&self, event: MonitorEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Event consumer is gone, dropping {} event", e.0.kind());
        }
    }
}

/// Create a dispatcher and the receiver its events arrive on
pub fn channel() -> (ChannelDispatcher, UnboundedReceiver<MonitorEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelDispatcher::new(sender), receiver)
}

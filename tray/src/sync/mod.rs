//! Delivery of monitor events to a single consuming context

pub mod decorator;
pub mod dispatch;
pub mod pump;

pub use decorator::Synchronized;
pub use dispatch::{channel, ChannelDispatcher, Dispatch};
pub use pump::{EventBus, EventHandler, EventPump};

//! Outbox relay: polls pending entries and hands them to event handlers.

pub mod dispatcher;
pub mod poller;
pub mod post_created;

pub use dispatcher::{DispatchError, EventDispatcher, EventHandler};
pub use poller::{RelayConfig, RelayPoller, TickReport};
pub use post_created::PostCreatedHandler;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::domain::types::OutboxEntry;
use crate::error::NotifyServiceError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Payload does not match what the handler expects. Retrying will not help.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// Recipients could not be looked up. The whole entry is retried.
    #[error("recipient resolution failed: {0}")]
    Resolution(#[source] NotifyServiceError),
}

/// Handles one event type.
pub trait EventHandler: Send + Sync {
    fn handle<'a>(&'a self, entry: &'a OutboxEntry) -> BoxFuture<'a, Result<(), DispatchError>>;
}

/// Routes outbox entries to the handler registered for their `event_type`.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, event_type: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        self.register(event_type, handler);
        self
    }

    /// Replaces any handler already registered for `event_type`.
    pub fn register(&mut self, event_type: impl Into<String>, handler: impl EventHandler + 'static) {
        self.handlers.insert(event_type.into(), Arc::new(handler));
    }

    #[cfg(test)]
    fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Unknown event types succeed without doing anything, so the relay still
    /// marks them processed.
    pub async fn dispatch(&self, entry: &OutboxEntry) -> Result<(), DispatchError> {
        match self.handlers.get(&entry.event_type) {
            Some(handler) => handler.handle(entry).await,
            None => {
                debug!(event_id = %entry.id, event_type = %entry.event_type, "no handler, skipping");
                Ok(())
            }
        }
    }
}

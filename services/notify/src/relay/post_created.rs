use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::domain::repository::SubscriberRepository;
use crate::domain::types::{NotificationPayload, OutboxEntry};
use crate::registry::NotificationRegistry;
use crate::relay::dispatcher::{DispatchError, EventHandler};

/// Fans a `POST_CREATED` event out to the topic's subscribers, minus the author.
pub struct PostCreatedHandler<S> {
    pub subscribers: S,
    pub registry: Arc<NotificationRegistry>,
}

impl<S: SubscriberRepository> PostCreatedHandler<S> {
    pub fn new(subscribers: S, registry: Arc<NotificationRegistry>) -> Self {
        Self {
            subscribers,
            registry,
        }
    }

    async fn relay(&self, entry: &OutboxEntry) -> Result<(), DispatchError> {
        let payload: NotificationPayload = serde_json::from_value(entry.payload.clone())?;

        let recipients = self
            .subscribers
            .find_subscribers(&payload.topic_name, payload.user_id)
            .await
            .map_err(DispatchError::Resolution)?;

        let mut delivered = 0;
        for recipient in recipients {
            if recipient == payload.user_id {
                continue;
            }
            let delivery = self.registry.send(recipient, &payload);
            debug!(
                event_id = %entry.id,
                user_id = %recipient,
                streams = delivery.delivered,
                dropped = delivery.dropped,
                "relayed notification"
            );
            delivered += delivery.delivered;
        }

        info!(
            event_id = %entry.id,
            topic = %payload.topic_name,
            delivered,
            "post notification relayed"
        );
        Ok(())
    }
}

impl<S: SubscriberRepository> EventHandler for PostCreatedHandler<S> {
    fn handle<'a>(&'a self, entry: &'a OutboxEntry) -> BoxFuture<'a, Result<(), DispatchError>> {
        Box::pin(self.relay(entry))
    }
}

#![allow(async_fn_in_trait)]

use std::future::Future;

use uuid::Uuid;

use crate::domain::types::{OutboxEntry, Post, Topic};
use crate::error::NotifyServiceError;

// The relay-side ports spell out `Send` futures: their callers are boxed into
// `dyn EventHandler` and spawned onto the runtime from generic code.

/// Read/update side of the outbox, used by the relay.
pub trait OutboxRepository: Send + Sync {
    /// Up to `limit` `PENDING` entries, oldest `created_at` first.
    fn fetch_pending_batch(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<OutboxEntry>, NotifyServiceError>> + Send;

    /// Flip one entry to `PROCESSED`. Runs outside the producer's transaction.
    fn mark_processed(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<(), NotifyServiceError>> + Send;
}

/// Resolves who follows a topic.
pub trait SubscriberRepository: Send + Sync {
    /// User ids subscribed to the topic named `topic_name`, without `exclude`.
    fn find_subscribers(
        &self,
        topic_name: &str,
        exclude: Uuid,
    ) -> impl Future<Output = Result<Vec<Uuid>, NotifyServiceError>> + Send;
}

/// Producer side: posts and their outbox rows.
pub trait PostRepository: Send + Sync {
    /// Name of the topic, or `None` if it does not exist.
    async fn find_topic_name(&self, topic_id: Uuid) -> Result<Option<String>, NotifyServiceError>;

    /// Posts in the topic, newest first.
    async fn list_by_topic(&self, topic_id: Uuid) -> Result<Vec<Post>, NotifyServiceError>;

    /// Insert the post and its outbox entry atomically (same transaction).
    /// Either both rows are committed or neither is.
    async fn create_with_outbox(
        &self,
        post: &Post,
        entry: &OutboxEntry,
    ) -> Result<(), NotifyServiceError>;
}

/// Topic membership writes.
pub trait SubscriptionRepository: Send + Sync {
    async fn topic_exists(&self, topic_id: Uuid) -> Result<bool, NotifyServiceError>;

    /// Idempotent: subscribing twice is not an error.
    async fn subscribe(&self, user_id: Uuid, topic_id: Uuid) -> Result<(), NotifyServiceError>;

    /// Topics `user_id` follows, by name.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Topic>, NotifyServiceError>;

    /// Returns `true` if a subscription was removed.
    async fn unsubscribe(&self, user_id: Uuid, topic_id: Uuid)
    -> Result<bool, NotifyServiceError>;
}

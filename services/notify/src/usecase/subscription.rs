use uuid::Uuid;

use crate::domain::repository::SubscriptionRepository;
use crate::domain::types::Topic;
use crate::error::NotifyServiceError;

// ── Subscribe ────────────────────────────────────────────────────────────────

pub struct SubscribeUseCase<R: SubscriptionRepository> {
    pub repo: R,
}

impl<R: SubscriptionRepository> SubscribeUseCase<R> {
    pub async fn execute(&self, user_id: Uuid, topic_id: Uuid) -> Result<(), NotifyServiceError> {
        if !self.repo.topic_exists(topic_id).await? {
            return Err(NotifyServiceError::TopicNotFound);
        }
        self.repo.subscribe(user_id, topic_id).await
    }
}

// ── Unsubscribe ──────────────────────────────────────────────────────────────

pub struct UnsubscribeUseCase<R: SubscriptionRepository> {
    pub repo: R,
}

impl<R: SubscriptionRepository> UnsubscribeUseCase<R> {
    /// Unsubscribing from a topic the user does not follow is a no-op.
    pub async fn execute(&self, user_id: Uuid, topic_id: Uuid) -> Result<(), NotifyServiceError> {
        self.repo.unsubscribe(user_id, topic_id).await?;
        Ok(())
    }
}

// ── ListSubscriptions ────────────────────────────────────────────────────────

pub struct ListSubscriptionsUseCase<R: SubscriptionRepository> {
    pub repo: R,
}

impl<R: SubscriptionRepository> ListSubscriptionsUseCase<R> {
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<Topic>, NotifyServiceError> {
        self.repo.list_for_user(user_id).await
    }
}

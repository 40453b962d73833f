use chrono::Utc;
use uuid::Uuid;

use crate::domain::repository::PostRepository;
use crate::domain::types::{
    NotificationPayload, OutboxEntry, POST_AGGREGATE, POST_CREATED, Post,
};
use crate::error::NotifyServiceError;

pub struct CreatePostInput {
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

// ── CreatePost ───────────────────────────────────────────────────────────────

pub struct CreatePostUseCase<R: PostRepository> {
    pub repo: R,
}

impl<R: PostRepository> CreatePostUseCase<R> {
    /// Write the post and its `POST_CREATED` outbox entry in one transaction.
    ///
    /// Succeeds once both rows are committed; delivery happens later in the relay.
    pub async fn execute(&self, input: CreatePostInput) -> Result<Post, NotifyServiceError> {
        let topic_name = self
            .repo
            .find_topic_name(input.topic_id)
            .await?
            .ok_or(NotifyServiceError::TopicNotFound)?;

        let post = Post {
            id: Uuid::now_v7(),
            topic_id: input.topic_id,
            author_id: input.author_id,
            title: input.title,
            content: input.content,
            created_at: Utc::now(),
        };

        let payload = NotificationPayload::for_post(&post, &topic_name);
        let payload = serde_json::to_value(&payload)
            .map_err(|e| NotifyServiceError::Internal(e.into()))?;
        let entry = OutboxEntry::pending(post.id.to_string(), POST_AGGREGATE, POST_CREATED, payload);

        self.repo.create_with_outbox(&post, &entry).await?;
        Ok(post)
    }
}

// ── ListTopicPosts ───────────────────────────────────────────────────────────

pub struct ListTopicPostsUseCase<R: PostRepository> {
    pub repo: R,
}

impl<R: PostRepository> ListTopicPostsUseCase<R> {
    /// Newest first.
    pub async fn execute(&self, topic_id: Uuid) -> Result<Vec<Post>, NotifyServiceError> {
        if self.repo.find_topic_name(topic_id).await?.is_none() {
            return Err(NotifyServiceError::TopicNotFound);
        }
        self.repo.list_by_topic(topic_id).await
    }
}

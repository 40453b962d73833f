use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type written when a post is created.
pub const POST_CREATED: &str = "POST_CREATED";

/// Aggregate type for post events.
pub const POST_AGGREGATE: &str = "POST";

/// Lifecycle of an outbox row.
///
/// `Failed` exists in the schema but the relay never assigns it: entries that
/// fail to dispatch stay `Pending` and are retried every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSED" => Some(Self::Processed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A durable "something happened" record, co-written with its business row.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    /// Opaque to the relay; decoded by the handler registered for `event_type`.
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// A new `PENDING` entry stamped now.
    pub fn pending(
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            payload,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// What subscribers receive on their stream for a new post.
///
/// `user_id` is the author. It is only used to keep authors from being
/// notified about their own posts.
///
/// Both ids travel as UUID strings. Anything else fails to decode, and the
/// relay keeps such an entry `PENDING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub message: String,
    pub topic_name: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
}

impl NotificationPayload {
    pub fn for_post(post: &Post, topic_name: &str) -> Self {
        Self {
            message: format!("New post in {topic_name}: {}", post.title),
            topic_name: topic_name.to_owned(),
            post_id: post.id,
            user_id: post.author_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

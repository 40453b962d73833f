use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_core::identity::Identity;

use crate::domain::types::Post;
use crate::error::NotifyServiceError;
use crate::state::AppState;
use crate::usecase::post::{CreatePostInput, CreatePostUseCase, ListTopicPostsUseCase};

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct CreatePostResponse {
    pub id: Uuid,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            topic_id: post.topic_id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
        }
    }
}

// ── GET /topics/{topic_id}/posts ─────────────────────────────────────────────

pub async fn list_topic_posts(
    _identity: Identity,
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<Vec<PostResponse>>, NotifyServiceError> {
    let usecase = ListTopicPostsUseCase {
        repo: state.post_repo(),
    };
    let posts = usecase.execute(topic_id).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

// ── POST /topics/{topic_id}/posts ────────────────────────────────────────────

pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<CreatePostResponse>), NotifyServiceError> {
    let usecase = CreatePostUseCase {
        repo: state.post_repo(),
    };
    let post = usecase
        .execute(CreatePostInput {
            topic_id,
            author_id: identity.user_id,
            title: body.title,
            content: body.content,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            id: post.id,
            created_at: post.created_at,
        }),
    ))
}

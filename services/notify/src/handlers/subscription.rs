use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use pulse_core::identity::Identity;

use crate::error::NotifyServiceError;
use crate::state::AppState;
use crate::usecase::subscription::{
    ListSubscriptionsUseCase, SubscribeUseCase, UnsubscribeUseCase,
};

pub async fn subscribe(
    identity: Identity,
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Result<StatusCode, NotifyServiceError> {
    let usecase = SubscribeUseCase {
        repo: state.subscription_repo(),
    };
    usecase.execute(identity.user_id, topic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unsubscribe(
    identity: Identity,
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Result<StatusCode, NotifyServiceError> {
    let usecase = UnsubscribeUseCase {
        repo: state.subscription_repo(),
    };
    usecase.execute(identity.user_id, topic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct TopicResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

// ── GET /subscriptions ───────────────────────────────────────────────────────

pub async fn list_subscriptions(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<TopicResponse>>, NotifyServiceError> {
    let usecase = ListSubscriptionsUseCase {
        repo: state.subscription_repo(),
    };
    let topics = usecase.execute(identity.user_id).await?;
    Ok(Json(
        topics
            .into_iter()
            .map(|topic| TopicResponse {
                id: topic.id,
                name: topic.name,
                description: topic.description,
            })
            .collect(),
    ))
}

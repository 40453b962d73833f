use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use pulse_core::health::{healthz, readiness};
use pulse_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    events::stream_events,
    post::{create_post, list_topic_posts},
    subscription::{list_subscriptions, subscribe, unsubscribe},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Live notifications
        .route("/events", get(stream_events))
        // Posts
        .route(
            "/topics/{topic_id}/posts",
            get(list_topic_posts).post(create_post),
        )
        // Subscriptions
        .route("/subscriptions", get(list_subscriptions))
        .route("/topics/{topic_id}/subscribe", post(subscribe))
        .route("/topics/{topic_id}/unsubscribe", post(unsubscribe))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.registry.is_accepting())
}

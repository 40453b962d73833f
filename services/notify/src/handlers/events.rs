use std::convert::Infallible;

use axum::{
    extract::State,
    http::header,
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use tracing::info;

use pulse_core::identity::Identity;

use crate::error::NotifyServiceError;
use crate::registry::Subscription;
use crate::state::AppState;

/// First frame on every stream, sent before any notification.
pub const HANDSHAKE: &str = "connected";

// ── GET /events ──────────────────────────────────────────────────────────────

/// Open a live notification stream for the caller.
///
/// The stream stays registered until the client goes away: hyper drops the
/// body, which drops the [`Subscription`] and unregisters it.
pub async fn stream_events(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, NotifyServiceError> {
    let subscription = state.registry.register(identity.user_id)?;
    info!(
        user_id = %identity.user_id,
        stream_id = subscription.id(),
        "notification stream opened"
    );

    // axum sets `Content-Type: text/event-stream` and `Cache-Control: no-cache`.
    Ok((
        [(header::CONNECTION, "keep-alive")],
        Sse::new(delivery_stream(subscription)),
    ))
}

/// Handshake frame, then one frame per notification, until the subscription closes.
pub fn delivery_stream(
    subscription: Subscription,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let handshake = stream::once(async { Ok(Event::default().data(HANDSHAKE)) });
    let notifications = stream::unfold(subscription, |mut subscription| async move {
        let frame = subscription.recv().await?;
        Some((Ok(Event::default().data(&*frame)), subscription))
    });
    handshake.chain(notifications)
}

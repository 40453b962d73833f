use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::registry::RegistryError;

/// Notify service error variants.
#[derive(Debug, thiserror::Error)]
pub enum NotifyServiceError {
    #[error("topic not found")]
    TopicNotFound,
    #[error("service is shutting down")]
    ShuttingDown,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl NotifyServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TopicNotFound => "TOPIC_NOT_FOUND",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<RegistryError> for NotifyServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ShuttingDown => Self::ShuttingDown,
        }
    }
}

impl IntoResponse for NotifyServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::TopicNotFound => StatusCode::NOT_FOUND,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer already records every request's status; only 500s need the
        // anyhow chain logged here.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

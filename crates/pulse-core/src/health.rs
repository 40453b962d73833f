use axum::http::StatusCode;

/// Handler for `GET /healthz`. The process is up and serving HTTP.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Handler for `GET /readyz`.
///
/// Returns 503 once the service has begun shutting down so the gateway stops
/// routing new long-lived streams to this instance.
pub fn readiness(accepting: bool) -> StatusCode {
    if accepting {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

use std::sync::Arc;

use sea_orm::Database;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pulse_core::tracing::init_tracing;
use pulse_notify::config::NotifyConfig;
use pulse_notify::domain::types::POST_CREATED;
use pulse_notify::infra::db::{DbOutboxRepository, DbSubscriberRepository};
use pulse_notify::registry::NotificationRegistry;
use pulse_notify::relay::{EventDispatcher, PostCreatedHandler, RelayPoller};
use pulse_notify::router::build_router;
use pulse_notify::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = NotifyConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let registry = Arc::new(NotificationRegistry::new(config.stream_buffer));
    let cancel = CancellationToken::new();

    // Relay
    let dispatcher = EventDispatcher::new().with_handler(
        POST_CREATED,
        PostCreatedHandler::new(
            DbSubscriberRepository { db: db.clone() },
            Arc::clone(&registry),
        ),
    );
    let poller = RelayPoller::new(
        DbOutboxRepository { db: db.clone() },
        dispatcher,
        config.relay(),
    );
    let relay = tokio::spawn(poller.run(cancel.clone()));

    // HTTP
    let state = AppState {
        db,
        registry: Arc::clone(&registry),
    };
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.notify_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("notify service listening on {addr}");
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(cancel.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        result = &mut server => {
            warn!(?result, "http server exited");
        }
    }

    cancel.cancel();
    registry.shutdown();

    // Open streams keep their connections alive; give them a bounded grace period.
    if !server.is_finished() {
        match tokio::time::timeout(config.shutdown_grace(), &mut server).await {
            Ok(_) => info!("http server drained"),
            Err(_) => {
                warn!("grace period elapsed with streams still open, closing");
                server.abort();
            }
        }
    }

    if let Err(e) = relay.await {
        warn!(error = %e, "outbox relay task failed");
    }
    info!("notify service stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

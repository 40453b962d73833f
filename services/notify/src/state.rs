use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::infra::db::{DbPostRepository, DbSubscriptionRepository};
use crate::registry::NotificationRegistry;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub registry: Arc<NotificationRegistry>,
}

impl AppState {
    pub fn post_repo(&self) -> DbPostRepository {
        DbPostRepository {
            db: self.db.clone(),
        }
    }

    pub fn subscription_repo(&self) -> DbSubscriptionRepository {
        DbSubscriptionRepository {
            db: self.db.clone(),
        }
    }
}

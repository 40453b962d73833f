//! sea-orm entities for the notify service.

pub mod outbox;
pub mod posts;
pub mod subscriptions;
pub mod topics;

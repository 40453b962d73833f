//! Shared building blocks for Pulse services.
//!
//! Health probes, the gateway identity extractor, request-id middleware,
//! serde helpers and tracing setup.

pub mod health;
pub mod identity;
pub mod middleware;
pub mod serde;
pub mod tracing;

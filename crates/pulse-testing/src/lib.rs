//! Test utilities for Pulse services.
//!
//! Provides `MockAuth` identity headers and an SSE frame reader for
//! streaming endpoints. Use from tests only.

pub mod auth;
pub mod sse;

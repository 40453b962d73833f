//! Mock identity for integration tests.
//!
//! Services sit behind the gateway, which injects `x-pulse-user-id` after
//! authenticating the caller. Tests inject the header directly.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use pulse_core::identity::USER_ID_HEADER;

/// Identity injected into test requests.
#[derive(Debug, Clone, Copy)]
pub struct MockAuth {
    pub user_id: Uuid,
}

impl MockAuth {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    /// A fresh random identity.
    pub fn random() -> Self {
        Self::new(Uuid::new_v4())
    }

    pub fn header_name(&self) -> HeaderName {
        HeaderName::from_static(USER_ID_HEADER)
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.user_id.to_string()).unwrap()
    }

    /// Headers as if the gateway injected them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(self.header_name(), self.header_value());
        map
    }
}

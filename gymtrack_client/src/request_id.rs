//! Correlation ids for request tracing

use gymtrack_session::RequestId;
use http::HeaderName;

pub(crate) const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh correlation id
///
/// Every outgoing request attempt gets its own id; two calls never return the
/// same value. A transparent replay after a token refresh keeps the id of the
/// attempt it replays.
pub fn next_request_id() -> RequestId {
    RequestId::from(uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_never_collide() {
        let first = next_request_id();
        let second = next_request_id();
        assert_ne!(first, second);
    }

    #[test]
    fn ids_are_valid_header_values() {
        let id = next_request_id();
        assert!(http::HeaderValue::from_str(id.as_str()).is_ok());
    }
}

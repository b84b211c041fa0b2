//! Failure classification for API calls
//!
//! Every failure surfaced by this crate is an [`ApiError`]. Classification
//! happens once, at the edge: transport failures are split into timeout,
//! network-unreachable, and the rest; non-success responses keep their status
//! and whatever `message` the server put in the body. The user-facing
//! rendering in [`ApiError::user_message`] is a pure function over that
//! classification and is safe to call anywhere, including in tests with no
//! network in sight.

use std::borrow::Cow;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// A failed API call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("server responded with status {status}")]
    Status {
        /// The HTTP status of the response
        status: StatusCode,
        /// The `message` field of the response body, when present
        message: Option<String>,
    },
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The server could not be reached at all
    #[error("network error while reaching the server")]
    Network,
    /// Any other transport-level failure
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// A failure raised inside the middleware stack, including a rejected
    /// token refresh
    #[error("{0}")]
    Middleware(#[source] anyhow::Error),
    /// A request path could not be joined onto the service base address
    #[error("invalid request url")]
    Url(#[from] url::ParseError),
}

// Body shape the backend uses for error payloads. Anything else in the body
// is ignored.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Classifies a non-success response, draining its body for a server
    /// message
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.message),
            Err(error) => {
                tracing::debug!(
                    status = status.as_u16(),
                    error = %error,
                    "could not read error response body"
                );
                None
            }
        };
        Self::Status { status, message }
    }

    /// The status of the failed response, when the failure carries one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Renders the failure as the message shown to the user
    ///
    /// Priority: the server's own `message` field, then the canned mapping
    /// for well-known statuses, then the timeout and network renderings, and
    /// finally the failure's own display. Pure: no network, no mutation.
    pub fn user_message(&self) -> Cow<'static, str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => Cow::Owned(message.clone()),
            Self::Status { status, .. } => match status_message(*status) {
                Some(canned) => Cow::Borrowed(canned),
                None => Cow::Owned(format!(
                    "Request failed with status {}",
                    status.as_u16()
                )),
            },
            Self::Timeout => Cow::Borrowed("Request timeout. Please try again."),
            Self::Network => {
                Cow::Borrowed("Network error. Please check your internet connection.")
            }
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Network
        } else {
            Self::Transport(error)
        }
    }
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(error) => error.into(),
            reqwest_middleware::Error::Middleware(error) => {
                match error.downcast::<crate::refresh::RefreshFailure>() {
                    // a rejected refresh keeps its original classification
                    Ok(failure) => failure.into_api_error(),
                    Err(error) => Self::Middleware(error),
                }
            }
        }
    }
}

// The fixed status-to-message table surfaced to users. The wording is part of
// the client contract; do not edit casually.
fn status_message(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() {
        400 => Some("Invalid request. Please check your input and try again."),
        401 => Some("Your session has expired. Please log in again."),
        403 => Some("You don't have permission to perform this action."),
        404 => Some("The requested resource was not found."),
        409 => Some("This information is already in use. Please use different values."),
        422 => Some("Unable to process your request. Please check your input."),
        500 => Some("Server error occurred. Please try again later."),
        503 => Some("Service temporarily unavailable. Please try again later."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_takes_priority_over_the_canned_mapping() {
        let error = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some("Custom server error".to_owned()),
        };
        assert_eq!(error.user_message(), "Custom server error");
    }

    #[test]
    fn canned_mapping_covers_the_well_known_statuses() {
        let cases = [
            (400, "Invalid request. Please check your input and try again."),
            (401, "Your session has expired. Please log in again."),
            (403, "You don't have permission to perform this action."),
            (404, "The requested resource was not found."),
            (
                409,
                "This information is already in use. Please use different values.",
            ),
            (422, "Unable to process your request. Please check your input."),
            (500, "Server error occurred. Please try again later."),
            (503, "Service temporarily unavailable. Please try again later."),
        ];
        for (status, expected) in cases {
            let error = ApiError::Status {
                status: StatusCode::from_u16(status).unwrap(),
                message: None,
            };
            assert_eq!(error.user_message(), expected, "status {status}");
        }
    }

    #[test]
    fn unmapped_status_reports_the_raw_code() {
        let error = ApiError::Status {
            status: StatusCode::IM_A_TEAPOT,
            message: None,
        };
        assert_eq!(error.user_message(), "Request failed with status 418");
    }

    #[test]
    fn timeout_and_network_have_fixed_renderings() {
        assert_eq!(
            ApiError::Timeout.user_message(),
            "Request timeout. Please try again."
        );
        assert_eq!(
            ApiError::Network.user_message(),
            "Network error. Please check your internet connection."
        );
    }

    #[test]
    fn other_failures_fall_back_to_their_own_display() {
        let error = ApiError::Middleware(anyhow::anyhow!("client-side state was malformed"));
        assert_eq!(error.user_message(), "client-side state was malformed");
    }

    #[test]
    fn user_message_is_pure() {
        let error = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: None,
        };
        assert_eq!(error.user_message(), error.user_message());
    }
}

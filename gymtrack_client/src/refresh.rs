//! The token refresh call and its single-flight wrapper
//!
//! The refresh endpoint is authenticated by the browser-style session cookie,
//! not by the bearer credential being replaced, so the refresher drives a
//! bare cookie-bearing client that shares its jar with the backend stack.
//! Exactly one refresh call is outstanding at any time; everyone else rides
//! the [`RefreshCoordinator`] queue.

use std::fmt;
use std::sync::Arc;

use gymtrack_session::store::CredentialStore;
use gymtrack_session::{AccessToken, RefreshCoordinator, RefreshFailed, RefreshTicket, SessionEvents};
use serde::Deserialize;
use thiserror::Error;

use crate::error::ApiError;

/// A rejected refresh, shareable across every caller that joined the attempt
#[derive(Clone, Debug, Error)]
#[error("token refresh failed: {0}")]
pub struct RefreshFailure(Arc<ApiError>);

impl RefreshFailure {
    fn new(error: ApiError) -> Self {
        Self(Arc::new(error))
    }

    fn abandoned() -> Self {
        Self::new(ApiError::Middleware(anyhow::anyhow!(
            "the refresh attempt was abandoned before it settled"
        )))
    }

    /// The classified failure of the refresh call
    pub fn api_error(&self) -> &ApiError {
        &self.0
    }

    // Recovers the strongest ApiError rendering available. Sole owner: hand
    // back the original. Shared: rebuild the cheap variants, wrap the rest.
    pub(crate) fn into_api_error(self) -> ApiError {
        match Arc::try_unwrap(self.0) {
            Ok(error) => error,
            Err(shared) => match &*shared {
                ApiError::Status { status, message } => ApiError::Status {
                    status: *status,
                    message: message.clone(),
                },
                ApiError::Timeout => ApiError::Timeout,
                ApiError::Network => ApiError::Network,
                _ => ApiError::Middleware(anyhow::Error::new(Self(shared))),
            },
        }
    }
}

// Success body shape: { "data": { "accessToken": "..." } }
#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    data: RefreshData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: AccessToken,
}

/// Performs cookie-authenticated token refreshes, one at a time
pub(crate) struct TokenRefresher {
    http: reqwest::Client,
    refresh_url: reqwest::Url,
    store: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator<RefreshFailure>,
    events: SessionEvents,
}

impl TokenRefresher {
    pub(crate) fn new(
        http: reqwest::Client,
        refresh_url: reqwest::Url,
        store: Arc<dyn CredentialStore>,
        events: SessionEvents,
    ) -> Self {
        Self {
            http,
            refresh_url,
            store,
            coordinator: RefreshCoordinator::new(),
            events,
        }
    }

    /// Obtains a fresh credential, joining an in-flight attempt when one
    /// exists
    ///
    /// The leader persists the new credential before waking anyone, so every
    /// waiter that replays afterwards reads the fresh value. On rejection the
    /// stored credential is dropped and the session is declared expired.
    pub(crate) async fn refresh(&self) -> Result<AccessToken, RefreshFailure> {
        let guard = match self.coordinator.acquire() {
            RefreshTicket::Waiter(waiter) => {
                tracing::debug!("refresh already in flight, awaiting its outcome");
                return waiter.wait().await.map_err(|failed| match failed {
                    RefreshFailed::Refresh(failure) => failure,
                    RefreshFailed::Abandoned => RefreshFailure::abandoned(),
                });
            }
            RefreshTicket::Leader(guard) => guard,
        };

        match self.request_token().await {
            Ok(token) => {
                if let Err(error) = self.store.persist(&token).await {
                    tracing::warn!(
                        error = (&*error as &dyn std::error::Error),
                        "unable to persist refreshed credential"
                    );
                }
                guard.complete(Ok(token.clone()));
                Ok(token)
            }
            Err(error) => {
                let failure = RefreshFailure::new(error);
                guard.complete(Err(failure.clone()));
                if let Err(error) = self.store.clear().await {
                    tracing::warn!(
                        error = (&*error as &dyn std::error::Error),
                        "unable to clear stored credential"
                    );
                }
                self.events.expire();
                Err(failure)
            }
        }
    }

    async fn request_token(&self) -> Result<AccessToken, ApiError> {
        tracing::debug!(url = %self.refresh_url, "requesting a fresh access token");

        let response = self
            .http
            .get(self.refresh_url.clone())
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "refresh was rejected");
            return Err(ApiError::from_response(response).await);
        }

        let envelope: RefreshEnvelope = response.json().await.map_err(ApiError::from)?;
        tracing::info!("obtained a refreshed access token");
        Ok(envelope.data.access_token)
    }
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("refresh_url", &self.refresh_url.as_str())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

//! Middleware for the authenticated client stacks
//!
//! Two layers, composed in order on both service clients:
//!
//! 1. [`AttachCredentials`] decorates every outgoing request with a fresh
//!    correlation id and, when a credential is stored, a bearer
//!    authorization header.
//! 2. [`RecoverAuth`] watches responses for a 401, obtains a fresh
//!    credential through the shared single-flight refresher, and transparently
//!    replays the original request once with only its authorization header
//!    changed.

use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use gymtrack_session::store::CredentialStore;
use gymtrack_session::AccessTokenRef;
use http::Extensions;
use reqwest::{header, Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next, Result};

use crate::refresh::TokenRefresher;
use crate::request_id::{next_request_id, X_REQUEST_ID};

/// Marks a request that has already been replayed once after a 401
///
/// A marked request never triggers another refresh, which caps the protocol
/// at one retry per original request even when the server keeps answering
/// 401.
#[derive(Clone, Copy, Debug)]
struct Replayed;

pub(crate) fn bearer_value(token: &AccessTokenRef) -> header::HeaderValue {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    let mut value = header::HeaderValue::from_maybe_shared(header_value.freeze())
        .expect("only valid header bytes");
    value.set_sensitive(true);
    value
}

/// Attaches the correlation id and the stored bearer credential
pub(crate) struct AttachCredentials {
    store: Arc<dyn CredentialStore>,
}

impl AttachCredentials {
    pub(crate) fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Middleware for AttachCredentials {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let request_id = next_request_id();
        match header::HeaderValue::from_str(request_id.as_str()) {
            Ok(value) => {
                req.headers_mut().insert(X_REQUEST_ID, value);
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, "generated request id is not header-safe");
            }
        }

        if !req.headers().contains_key(header::AUTHORIZATION) {
            match self.store.load().await {
                Ok(Some(token)) => {
                    req.headers_mut()
                        .insert(header::AUTHORIZATION, bearer_value(&token));
                }
                // No credential: send anyway, the server rejects where auth
                // is actually required.
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        error = (&*error as &dyn std::error::Error),
                        "unable to read stored credential"
                    );
                }
            }
        }

        next.run(req, extensions).await
    }
}

impl fmt::Debug for AttachCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AttachCredentials").finish_non_exhaustive()
    }
}

/// Recovers from an expired credential by refreshing and replaying once
pub(crate) struct RecoverAuth {
    refresher: Arc<TokenRefresher>,
}

impl RecoverAuth {
    pub(crate) fn new(refresher: Arc<TokenRefresher>) -> Self {
        Self { refresher }
    }
}

#[async_trait::async_trait]
impl Middleware for RecoverAuth {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        // Clone up front: the body may not be replayable (streaming), in
        // which case the 401 is propagated untouched.
        let replay = if extensions.get::<Replayed>().is_none() {
            req.try_clone()
        } else {
            None
        };

        let response = next.clone().run(req, extensions).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(mut replay) = replay else {
            return Ok(response);
        };

        tracing::debug!(url = %replay.url(), "authorization failed, attempting credential refresh");
        let token = match self.refresher.refresh().await {
            Ok(token) => token,
            Err(failure) => {
                return Err(reqwest_middleware::Error::Middleware(anyhow::Error::new(
                    failure,
                )));
            }
        };

        // Transparent replay: same body, same headers, same correlation id.
        // Only the authorization header changes.
        extensions.insert(Replayed);
        replay
            .headers_mut()
            .insert(header::AUTHORIZATION, bearer_value(&token));
        next.run(replay, extensions).await
    }
}

impl fmt::Debug for RecoverAuth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RecoverAuth")
            .field("refresher", &self.refresher)
            .finish()
    }
}

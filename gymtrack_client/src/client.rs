//! Composition of the two authenticated client stacks

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use gymtrack_session::store::{CredentialStore, InMemoryCredentialStore};
use gymtrack_session::{SessionEvents, SessionStatus};
use reqwest::cookie::Jar;
use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;
use tokio::sync::watch;

use crate::api;
use crate::config::{ClientConfig, ServiceConfig, HEALTH_TIMEOUT, REFRESH_PATH};
use crate::health::Service;
use crate::middleware::{AttachCredentials, RecoverAuth};
use crate::refresh::TokenRefresher;

/// The client pair could not be constructed
#[derive(Debug, Error)]
pub enum BuildError {
    /// A fixed path could not be joined onto a base address
    #[error("invalid service url")]
    Url(#[from] url::ParseError),
    /// The underlying HTTP client could not be built
    #[error("unable to build http client")]
    Http(#[from] reqwest::Error),
}

/// The authenticated clients for the backend and assistant services
///
/// Both stacks share one credential store, one cookie jar (backend side), and
/// one refresh coordinator, so an authorization failure on either service
/// blocks and later unblocks requests on both.
pub struct GymClient {
    config: ClientConfig,
    backend: ClientWithMiddleware,
    assistant: ClientWithMiddleware,
    store: Arc<dyn CredentialStore>,
    events: SessionEvents,
    // Assistant chat conversation state; see api::chat.
    pub(crate) chat_session: Mutex<Option<String>>,
    pub(crate) user_id: Mutex<Option<i64>>,
}

impl GymClient {
    /// Builds the client pair with an in-memory credential store
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        Self::with_store(config, Arc::new(InMemoryCredentialStore::new()))
    }

    /// Builds the client pair over the given credential store
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, BuildError> {
        let jar = Arc::new(Jar::default());
        let events = SessionEvents::new();

        // The refresh call authenticates with the session cookie only, so it
        // bypasses the middleware stacks but shares the backend's jar.
        let refresh_http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.backend.timeout)
            .build()?;
        let refresh_url = config.backend.base_url.join(REFRESH_PATH)?;
        let refresher = Arc::new(TokenRefresher::new(
            refresh_http,
            refresh_url,
            Arc::clone(&store),
            events.clone(),
        ));

        let backend = build_stack(&config.backend, &jar, &store, &refresher)?;
        let assistant = build_stack(&config.assistant, &jar, &store, &refresher)?;

        Ok(Self {
            config,
            backend,
            assistant,
            store,
            events,
            chat_session: Mutex::new(None),
            user_id: Mutex::new(None),
        })
    }

    /// The authenticated client for the primary backend
    pub fn backend(&self) -> &ClientWithMiddleware {
        &self.backend
    }

    /// The authenticated client for the assistant service
    pub fn assistant(&self) -> &ClientWithMiddleware {
        &self.assistant
    }

    /// The shared credential store
    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribes to session lifecycle changes
    ///
    /// The receiver flips to [`SessionStatus::Expired`] when a refresh is
    /// rejected; the embedding application should then route to its login
    /// entry point.
    pub fn session_updates(&self) -> watch::Receiver<SessionStatus> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Probes a service's health endpoint
    ///
    /// Returns `true` only for a success response within a short timeout;
    /// any failure, including timeout, yields `false`. Never errors.
    pub async fn check_service_health(&self, service: Service) -> bool {
        let (client, base) = match service {
            Service::Backend => (&self.backend, &self.config.backend.base_url),
            Service::Assistant => (&self.assistant, &self.config.assistant.base_url),
        };

        let url = match base.join(service.health_path()) {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(service = %service, error = %error, "invalid health url");
                return false;
            }
        };

        match client.get(url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    service = %service,
                    status = response.status().as_u16(),
                    "service reported unhealthy"
                );
                false
            }
            Err(error) => {
                tracing::warn!(service = %service, error = %error, "service unreachable");
                false
            }
        }
    }

    /// Account and session operations
    pub fn auth(&self) -> api::AuthApi<'_> {
        api::AuthApi { client: self }
    }

    /// The exercise catalog
    pub fn exercises(&self) -> api::ExercisesApi<'_> {
        api::ExercisesApi { client: self }
    }

    /// Workout logs and their nested sets
    pub fn workouts(&self) -> api::WorkoutsApi<'_> {
        api::WorkoutsApi { client: self }
    }

    /// The admin user-management console
    pub fn admin(&self) -> api::AdminApi<'_> {
        api::AdminApi { client: self }
    }

    /// The assistant chat panel
    pub fn chat(&self) -> api::ChatApi<'_> {
        api::ChatApi { client: self }
    }

    pub(crate) fn backend_url(&self, path: &str) -> Result<reqwest::Url, url::ParseError> {
        self.config.backend.base_url.join(path)
    }

    pub(crate) fn assistant_url(&self, path: &str) -> Result<reqwest::Url, url::ParseError> {
        self.config.assistant.base_url.join(path)
    }

    pub(crate) fn remember_user_id(&self, id: Option<i64>) {
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }

    pub(crate) fn known_user_id(&self) -> Option<i64> {
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for GymClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GymClient")
            .field("backend", &self.config.backend.base_url.as_str())
            .field("assistant", &self.config.assistant.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn build_stack(
    service: &ServiceConfig,
    jar: &Arc<Jar>,
    store: &Arc<dyn CredentialStore>,
    refresher: &Arc<TokenRefresher>,
) -> Result<ClientWithMiddleware, BuildError> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(service.timeout);
    if service.use_cookies {
        builder = builder.cookie_provider(Arc::clone(jar));
    }
    let client = builder.build()?;

    Ok(ClientBuilder::new(client)
        .with(AttachCredentials::new(Arc::clone(store)))
        .with(RecoverAuth::new(Arc::clone(refresher)))
        .build())
}

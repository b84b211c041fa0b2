//! Client configuration
//!
//! Base addresses come from the environment (`BACKEND_BASE_URL`,
//! `LLM_SERVICE_BASE_URL`) with loopback defaults matching the local
//! development setup. Timeouts and cookie behavior are fixed per service:
//! the backend participates in the cookie-based refresh flow with a 30 s
//! timeout, the assistant service gets no cookies and a generous 180 s
//! timeout for model-backed operations.

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Default base address of the primary backend service
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Default base address of the assistant service
pub const DEFAULT_ASSISTANT_URL: &str = "http://localhost:8001";

/// Environment variable overriding the backend base address
pub const BACKEND_URL_VAR: &str = "BACKEND_BASE_URL";

/// Environment variable overriding the assistant base address
pub const ASSISTANT_URL_VAR: &str = "LLM_SERVICE_BASE_URL";

pub(crate) const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub(crate) const BACKEND_HEALTH_PATH: &str = "/actuator/health";
pub(crate) const ASSISTANT_HEALTH_PATH: &str = "/health";
pub(crate) const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);
const ASSISTANT_TIMEOUT: Duration = Duration::from_secs(180);

/// Configuration of one target service
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Base address that request paths are joined onto
    pub base_url: Url,
    /// Timeout applied to every request against this service
    pub timeout: Duration,
    /// Whether the client keeps and sends session cookies
    ///
    /// Only the primary backend uses cookies; they carry the session proof
    /// consumed by the refresh endpoint.
    pub use_cookies: bool,
}

impl ServiceConfig {
    fn backend(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: BACKEND_TIMEOUT,
            use_cookies: true,
        }
    }

    fn assistant(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: ASSISTANT_TIMEOUT,
            use_cookies: false,
        }
    }
}

/// Configuration for the full client pair
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// The primary backend service
    pub backend: ServiceConfig,
    /// The assistant service
    pub assistant: ServiceConfig,
}

/// A configuration value could not be interpreted
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A base address was not a valid URL
    #[error("invalid base url in {var}: {value}")]
    InvalidUrl {
        /// The environment variable (or default) that carried the value
        var: &'static str,
        /// The offending value
        value: String,
        /// The parse failure
        source: url::ParseError,
    },
}

impl ClientConfig {
    /// Builds a configuration from the environment, with loopback defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = base_url_from_env(BACKEND_URL_VAR, DEFAULT_BACKEND_URL)?;
        let assistant = base_url_from_env(ASSISTANT_URL_VAR, DEFAULT_ASSISTANT_URL)?;
        Ok(Self::with_base_urls(backend, assistant))
    }

    /// Builds a configuration from explicit base addresses
    pub fn with_base_urls(backend: Url, assistant: Url) -> Self {
        Self {
            backend: ServiceConfig::backend(backend),
            assistant: ServiceConfig::assistant(assistant),
        }
    }
}

fn base_url_from_env(var: &'static str, default: &str) -> Result<Url, ConfigError> {
    let value = std::env::var(var).unwrap_or_else(|_| default.to_owned());
    value.parse().map_err(|source| {
        tracing::error!(var, value = %value, "service base url is not a valid url");
        ConfigError::InvalidUrl { var, value, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_point_at_loopback() {
        std::env::remove_var(BACKEND_URL_VAR);
        std::env::remove_var(ASSISTANT_URL_VAR);

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.backend.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.assistant.base_url.as_str(), "http://localhost:8001/");
        assert_eq!(config.backend.timeout, Duration::from_secs(30));
        assert_eq!(config.assistant.timeout, Duration::from_secs(180));
        assert!(config.backend.use_cookies);
        assert!(!config.assistant.use_cookies);
    }

    #[test]
    #[serial]
    fn environment_overrides_the_defaults() {
        std::env::set_var(BACKEND_URL_VAR, "http://backend.test:9000");
        std::env::set_var(ASSISTANT_URL_VAR, "http://assistant.test:9001");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.backend.base_url.as_str(), "http://backend.test:9000/");
        assert_eq!(
            config.assistant.base_url.as_str(),
            "http://assistant.test:9001/"
        );

        std::env::remove_var(BACKEND_URL_VAR);
        std::env::remove_var(ASSISTANT_URL_VAR);
    }

    #[test]
    #[serial]
    fn malformed_url_is_rejected() {
        std::env::set_var(BACKEND_URL_VAR, "not a url");
        let result = ClientConfig::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl {
                var: BACKEND_URL_VAR,
                ..
            })
        ));
        std::env::remove_var(BACKEND_URL_VAR);
    }
}

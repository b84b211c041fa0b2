//! Service health probes

use std::fmt;

/// A target service of the client pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    /// The primary backend service
    Backend,
    /// The assistant service
    Assistant,
}

impl Service {
    /// The service name used in logs and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Assistant => "assistant",
        }
    }

    pub(crate) fn health_path(self) -> &'static str {
        match self {
            Self::Backend => crate::config::BACKEND_HEALTH_PATH,
            Self::Assistant => crate::config::ASSISTANT_HEALTH_PATH,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

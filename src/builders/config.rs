//! Configuration Builder
//!
//! Fluent builder for server configuration.

use std::time::Duration;

use crate::error::{OAuth2Error, PreconditionError};
use crate::types::{ServerConfiguration, DEFAULT_REFRESH_WINDOW, DEFAULT_TIMEOUT};

/// Server configuration builder.
pub struct ServerConfigurationBuilder {
    base_url: Option<String>,
    token_endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Option<Duration>,
    refresh_window: Duration,
}

impl Default for ServerConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfigurationBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            token_endpoint: None,
            client_id: None,
            client_secret: None,
            timeout: Some(DEFAULT_TIMEOUT),
            refresh_window: DEFAULT_REFRESH_WINDOW,
        }
    }

    /// Set authorization server base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set token endpoint, relative to the base URL or absolute.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the per-request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set refresh window.
    pub fn refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> Result<ServerConfiguration, OAuth2Error> {
        let base_url = required(self.base_url, "base_url")?;
        let token_endpoint = required(self.token_endpoint, "token_endpoint")?;
        let client_id = required(self.client_id, "client_id")?;
        let client_secret = required(self.client_secret, "client_secret")?;

        Ok(
            ServerConfiguration::new(&base_url, token_endpoint, client_id, client_secret)?
                .with_timeout(self.timeout)
                .with_refresh_window(self.refresh_window),
        )
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, OAuth2Error> {
    value.ok_or_else(|| {
        OAuth2Error::Precondition(PreconditionError::MissingArgument {
            name: name.to_string(),
        })
    })
}

/// Create a new server configuration builder.
pub fn server_config() -> ServerConfigurationBuilder {
    ServerConfigurationBuilder::new()
}

//! Configuration Types
//!
//! Authorization server configuration shared by every token request.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use crate::error::{require_non_empty, OAuth2Error, PreconditionError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default lookahead before expiry at which tokens are refreshed.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(300);

/// Authorization server configuration.
///
/// Immutable once built; a [`crate::TokenClient`] holds one for its lifetime.
#[derive(Clone)]
pub struct ServerConfiguration {
    base_url: Url,
    token_endpoint: String,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
    /// Applied to every token request.
    timeout: Option<Duration>,
    /// Tokens whose remaining lifetime falls within this window are refreshed.
    refresh_window: Duration,
}

impl ServerConfiguration {
    /// Create a configuration, validating every field.
    ///
    /// `base_url` must be absolute. `token_endpoint` may be relative to it
    /// or an absolute URL of its own.
    pub fn new(
        base_url: &str,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, OAuth2Error> {
        let token_endpoint = token_endpoint.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        require_non_empty(base_url, "base_url")?;
        require_non_empty(&token_endpoint, "token_endpoint")?;
        require_non_empty(&client_id, "client_id")?;
        require_non_empty(&client_secret, "client_secret")?;

        let base_url = Url::parse(base_url).map_err(|e| PreconditionError::InvalidArgument {
            name: "base_url".to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PreconditionError::InvalidArgument {
                name: "base_url".to_string(),
                message: "URL cannot be used as a base".to_string(),
            }
            .into());
        }

        let token_url = resolve_endpoint(&base_url, &token_endpoint)?;

        Ok(Self {
            base_url,
            token_endpoint,
            token_url,
            client_id,
            client_secret: SecretString::new(client_secret),
            timeout: Some(DEFAULT_TIMEOUT),
            refresh_window: DEFAULT_REFRESH_WINDOW,
        })
    }

    /// Override the per-request timeout; `None` leaves requests unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the refresh window.
    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Fully resolved token endpoint.
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn refresh_window(&self) -> Duration {
        self.refresh_window
    }
}

impl std::fmt::Debug for ServerConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfiguration")
            .field("base_url", &self.base_url.as_str())
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("refresh_window", &self.refresh_window)
            .finish()
    }
}

/// Resolve `endpoint` against `base`.
///
/// The base path is treated as a directory and a leading `/` on a relative
/// endpoint is ignored, so `https://host/api` + `/tokens` yields
/// `https://host/api/tokens`. Absolute endpoints replace the base.
fn resolve_endpoint(base: &Url, endpoint: &str) -> Result<Url, OAuth2Error> {
    if let Ok(absolute) = Url::parse(endpoint) {
        if !absolute.cannot_be_a_base() {
            return Ok(absolute);
        }
    }

    let mut directory = base.clone();
    if !directory.path().ends_with('/') {
        let path = format!("{}/", directory.path());
        directory.set_path(&path);
    }

    directory
        .join(endpoint.trim_start_matches('/'))
        .map_err(|e| {
            PreconditionError::InvalidArgument {
                name: "token_endpoint".to_string(),
                message: e.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str, endpoint: &str) -> ServerConfiguration {
        ServerConfiguration::new(base, endpoint, "client", "secret").unwrap()
    }

    #[test]
    fn test_token_url_at_host_root() {
        let config = config("https://oauth.net", "/tokens");
        assert_eq!(config.token_url().as_str(), "https://oauth.net/tokens");
    }

    #[test]
    fn test_token_url_keeps_base_path() {
        assert_eq!(
            config("https://host/api", "/tokens").token_url().as_str(),
            "https://host/api/tokens"
        );
        assert_eq!(
            config("https://host/api/", "oauth/tokens").token_url().as_str(),
            "https://host/api/oauth/tokens"
        );
    }

    #[test]
    fn test_absolute_endpoint_replaces_base() {
        let config = config("https://host/api", "https://auth.example.com/token");
        assert_eq!(config.token_url().as_str(), "https://auth.example.com/token");
        assert_eq!(config.base_url().as_str(), "https://host/api");
    }

    #[test]
    fn test_defaults() {
        let config = config("https://oauth.net", "/tokens");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.refresh_window(), Duration::from_secs(300));
        assert_eq!(config.client_id(), "client");
        assert_eq!(config.client_secret(), "secret");
        assert_eq!(config.token_endpoint(), "/tokens");
    }

    #[test]
    fn test_overrides() {
        let config = config("https://oauth.net", "/tokens")
            .with_timeout(None)
            .with_refresh_window(Duration::from_secs(60));
        assert_eq!(config.timeout(), None);
        assert_eq!(config.refresh_window(), Duration::from_secs(60));
    }

    #[test]
    fn test_empty_fields_rejected() {
        for (base, endpoint, id, secret, name) in [
            ("", "/t", "c", "s", "base_url"),
            ("https://h", "", "c", "s", "token_endpoint"),
            ("https://h", "/t", "", "s", "client_id"),
            ("https://h", "/t", "c", "", "client_secret"),
        ] {
            let err = ServerConfiguration::new(base, endpoint, id, secret).unwrap_err();
            assert_eq!(
                err,
                OAuth2Error::Precondition(PreconditionError::EmptyArgument {
                    name: name.to_string()
                })
            );
        }
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let err = ServerConfiguration::new("/relative", "/tokens", "c", "s").unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Precondition(PreconditionError::InvalidArgument { ref name, .. }) if name == "base_url"
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", config("https://oauth.net", "/tokens"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("\"secret\""));
    }
}

//! Client Credentials Grant
//!
//! RFC 6749 Section 4.4 - Client Credentials Grant.

use secrecy::{ExposeSecret, SecretString};

use super::{FormParameters, GrantRequest};
use crate::error::{require_non_empty, OAuth2Error};

const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

/// Client credentials token request.
#[derive(Clone)]
pub struct ClientCredentialsGrantRequest {
    client_id: String,
    client_secret: SecretString,
    scope: Option<String>,
}

impl ClientCredentialsGrantRequest {
    /// Create a new request. `client_id` and `client_secret` must not be empty.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self, OAuth2Error> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        require_non_empty(&client_id, "client_id")?;
        require_non_empty(&client_secret, "client_secret")?;

        Ok(Self {
            client_id,
            client_secret: SecretString::new(client_secret),
            scope,
        })
    }
}

impl GrantRequest for ClientCredentialsGrantRequest {
    fn grant_type(&self) -> &'static str {
        CLIENT_CREDENTIALS_GRANT_TYPE
    }

    fn parameters(&self) -> FormParameters {
        let mut params = vec![
            ("grant_type", CLIENT_CREDENTIALS_GRANT_TYPE.to_string()),
            ("client_id", self.client_id.clone()),
            (
                "client_secret",
                self.client_secret.expose_secret().to_string(),
            ),
        ];
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.clone()));
        }
        params
    }
}

impl std::fmt::Debug for ClientCredentialsGrantRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsGrantRequest")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

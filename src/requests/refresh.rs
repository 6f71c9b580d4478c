//! Refresh Token Grant
//!
//! RFC 6749 Section 6 - Refreshing an Access Token.

use secrecy::{ExposeSecret, SecretString};

use super::{FormParameters, GrantRequest};
use crate::error::{require_non_empty, OAuth2Error};

const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// Refresh token request.
#[derive(Clone)]
pub struct RefreshTokenGrantRequest {
    refresh_token: SecretString,
    client_id: String,
    client_secret: SecretString,
}

impl RefreshTokenGrantRequest {
    /// Create a new request. All arguments must be non-empty.
    pub fn new(
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, OAuth2Error> {
        let refresh_token = refresh_token.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        require_non_empty(&refresh_token, "refresh_token")?;
        require_non_empty(&client_id, "client_id")?;
        require_non_empty(&client_secret, "client_secret")?;

        Ok(Self {
            refresh_token: SecretString::new(refresh_token),
            client_id,
            client_secret: SecretString::new(client_secret),
        })
    }
}

impl GrantRequest for RefreshTokenGrantRequest {
    fn grant_type(&self) -> &'static str {
        REFRESH_TOKEN_GRANT_TYPE
    }

    fn parameters(&self) -> FormParameters {
        vec![
            ("grant_type", REFRESH_TOKEN_GRANT_TYPE.to_string()),
            ("client_id", self.client_id.clone()),
            (
                "client_secret",
                self.client_secret.expose_secret().to_string(),
            ),
            (
                "refresh_token",
                self.refresh_token.expose_secret().to_string(),
            ),
        ]
    }
}

impl std::fmt::Debug for RefreshTokenGrantRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenGrantRequest")
            .field("refresh_token", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreconditionError;

    #[test]
    fn test_parameters() {
        let request = RefreshTokenGrantRequest::new("r3fr3sh", "client", "secret").unwrap();

        assert_eq!(request.grant_type(), "refresh_token");
        assert_eq!(
            request.parameters(),
            vec![
                ("grant_type", "refresh_token".to_string()),
                ("client_id", "client".to_string()),
                ("client_secret", "secret".to_string()),
                ("refresh_token", "r3fr3sh".to_string()),
            ]
        );
    }

    #[test]
    fn test_required_fields() {
        for (refresh_token, client_id, client_secret, field) in [
            ("", "client", "secret", "refresh_token"),
            ("r3fr3sh", "", "secret", "client_id"),
            ("r3fr3sh", "client", "", "client_secret"),
        ] {
            let result = RefreshTokenGrantRequest::new(refresh_token, client_id, client_secret);
            assert!(matches!(
                result,
                Err(OAuth2Error::Precondition(PreconditionError::EmptyArgument { ref name })) if name == field
            ));
        }
    }
}

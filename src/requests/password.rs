//! Resource Owner Password Credentials Grant
//!
//! RFC 6749 Section 4.3 - Resource Owner Password Credentials Grant.

use secrecy::{ExposeSecret, SecretString};

use super::{FormParameters, GrantRequest};
use crate::error::{require_non_empty, OAuth2Error};

const PASSWORD_GRANT_TYPE: &str = "password";

/// Resource owner password credentials token request.
#[derive(Clone)]
pub struct PasswordGrantRequest {
    username: String,
    password: SecretString,
    client_id: String,
    scope: Option<String>,
}

impl PasswordGrantRequest {
    /// Create a new request. `username`, `password` and `client_id` must not be empty.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self, OAuth2Error> {
        let username = username.into();
        let password = password.into();
        let client_id = client_id.into();
        require_non_empty(&username, "username")?;
        require_non_empty(&password, "password")?;
        require_non_empty(&client_id, "client_id")?;

        Ok(Self {
            username,
            password: SecretString::new(password),
            client_id,
            scope,
        })
    }
}

impl GrantRequest for PasswordGrantRequest {
    fn grant_type(&self) -> &'static str {
        PASSWORD_GRANT_TYPE
    }

    fn parameters(&self) -> FormParameters {
        let mut params = vec![
            ("grant_type", PASSWORD_GRANT_TYPE.to_string()),
            ("client_id", self.client_id.clone()),
            ("username", self.username.clone()),
            ("password", self.password.expose_secret().to_string()),
        ];
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.clone()));
        }
        params
    }
}

impl std::fmt::Debug for PasswordGrantRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrantRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreconditionError;

    #[test]
    fn test_parameters() {
        let request =
            PasswordGrantRequest::new("alice", "pa55", "client", Some("profile".to_string()))
                .unwrap();

        assert_eq!(request.grant_type(), "password");
        assert_eq!(
            request.parameters(),
            vec![
                ("grant_type", "password".to_string()),
                ("client_id", "client".to_string()),
                ("username", "alice".to_string()),
                ("password", "pa55".to_string()),
                ("scope", "profile".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope_omitted_when_absent() {
        let request = PasswordGrantRequest::new("alice", "pa55", "client", None).unwrap();
        assert!(request.parameters().iter().all(|(k, _)| *k != "scope"));
    }

    #[test]
    fn test_empty_scope_is_still_sent() {
        let request =
            PasswordGrantRequest::new("alice", "pa55", "client", Some(String::new())).unwrap();
        assert!(request
            .parameters()
            .contains(&("scope", String::new())));
    }

    #[test]
    fn test_required_fields() {
        for (username, password, client_id, field) in [
            ("", "pa55", "client", "username"),
            ("alice", "", "client", "password"),
            ("alice", "pa55", "", "client_id"),
        ] {
            let result = PasswordGrantRequest::new(username, password, client_id, None);
            assert!(matches!(
                result,
                Err(OAuth2Error::Precondition(PreconditionError::EmptyArgument { ref name })) if name == field
            ));
        }
    }
}

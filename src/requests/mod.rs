//! Token Requests
//!
//! Form-encoded token endpoint requests for the supported grants:
//!
//! - **Resource Owner Password Credentials** (RFC 6749 Section 4.3)
//! - **Client Credentials** (RFC 6749 Section 4.4)
//! - **Refresh Token** (RFC 6749 Section 6)
//!
//! Each grant validates its inputs on construction and produces its
//! parameters in a fixed order.

pub mod client_credentials;
pub mod password;
pub mod refresh;

pub use client_credentials::ClientCredentialsGrantRequest;
pub use password::PasswordGrantRequest;
pub use refresh::RefreshTokenGrantRequest;

use std::collections::HashMap;
use url::Url;

use crate::core::{HttpMethod, HttpRequest};
use crate::error::{OAuth2Error, PreconditionError};

/// Ordered form parameters.
pub type FormParameters = Vec<(&'static str, String)>;

/// A token endpoint request for one grant type.
pub trait GrantRequest: Send + Sync {
    /// The `grant_type` parameter value.
    fn grant_type(&self) -> &'static str;

    /// Produce the form parameters, `grant_type` first.
    fn parameters(&self) -> FormParameters;

    /// Build a form-encoded POST to `token_url`.
    fn to_http_request(&self, token_url: Option<&Url>) -> Result<HttpRequest, OAuth2Error> {
        let token_url = token_url.ok_or_else(|| PreconditionError::MissingArgument {
            name: "token_url".to_string(),
        })?;

        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: token_url.to_string(),
            headers,
            body: Some(encode_form(&self.parameters())),
            timeout: None,
        })
    }
}

/// URL-encode parameters as an `application/x-www-form-urlencoded` body.
pub fn encode_form(parameters: &[(&'static str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(parameters.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

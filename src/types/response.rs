//! Token Responses
//!
//! Decoding of token endpoint payloads into [`AccessToken`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{OAuth2Error, ValidationError};
use crate::types::AccessToken;

/// Token response from authorization server.
///
/// Every field is optional so a partially populated payload still decodes;
/// required fields are checked by [`TokenResponse::into_access_token`].
#[derive(Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (usually "bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Lifetime in seconds, relative to when the response is decoded.
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    pub expires_in: Option<i64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Convert into an access token, anchoring `expires_in` at the current time.
    pub fn into_access_token(self) -> Result<AccessToken, OAuth2Error> {
        self.into_access_token_at(Utc::now())
    }

    /// Convert into an access token, anchoring `expires_in` at `now`.
    pub fn into_access_token_at(self, now: DateTime<Utc>) -> Result<AccessToken, OAuth2Error> {
        let access_token = required_field(self.access_token, "access_token")?;
        let token_type = required_field(self.token_type, "token_type")?;

        let expiration_date = match self.expires_in {
            Some(seconds) => Some(
                chrono::Duration::try_seconds(seconds)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| ValidationError::InvalidPayload {
                        message: format!("expires_in out of range: {}", seconds),
                    })?,
            ),
            None => None,
        };

        AccessToken::new(
            access_token,
            token_type,
            self.scope,
            expiration_date,
            self.refresh_token,
        )
    }
}

fn required_field(value: Option<String>, field: &str) -> Result<String, OAuth2Error> {
    match value {
        None => Err(ValidationError::MissingField {
            field: field.to_string(),
        }
        .into()),
        Some(value) if value.is_empty() => Err(ValidationError::EmptyField {
            field: field.to_string(),
        }
        .into()),
        Some(value) => Ok(value),
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

/// Servers disagree on whether `expires_in` is a number or a string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(seconds)) => Ok(Some(seconds)),
        Some(NumberOrString::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Error-shaped token endpoint payload (RFC 6749 Section 5.2).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenErrorResponse {
    /// True when both fields are absent or blank.
    pub fn is_empty(&self) -> bool {
        is_blank(&self.error) && is_blank(&self.error_description)
    }

    /// The description, falling back to the error code.
    pub fn description(&self) -> String {
        if !is_blank(&self.error_description) {
            return self.error_description.clone().unwrap_or_default();
        }
        self.error.clone().unwrap_or_default()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Parse an error payload, if `body` carries a non-empty one.
pub fn parse_error_response(body: &str) -> Option<TokenErrorResponse> {
    serde_json::from_str::<TokenErrorResponse>(body)
        .ok()
        .filter(|response| !response.is_empty())
}

/// Decode a token endpoint body into an access token.
pub fn decode_token_response(body: &str) -> Result<AccessToken, OAuth2Error> {
    decode_token_response_at(body, Utc::now())
}

/// [`decode_token_response`] with an explicit decode time.
///
/// A payload carrying a non-blank `error` or `error_description` becomes
/// [`OAuth2Error::Grant`] before any token decoding is attempted.
pub fn decode_token_response_at(body: &str, now: DateTime<Utc>) -> Result<AccessToken, OAuth2Error> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ValidationError::InvalidPayload {
            message: e.to_string(),
        })?;

    if let Ok(error) = TokenErrorResponse::deserialize(&value) {
        if !error.is_empty() {
            tracing::warn!(error = ?error.error, "authorization server rejected the grant");
            return Err(OAuth2Error::Grant {
                description: error.description(),
            });
        }
    }

    let response = TokenResponse::deserialize(value).map_err(|e| ValidationError::InvalidPayload {
        message: e.to_string(),
    })?;

    response.into_access_token_at(now)
}

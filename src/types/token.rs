//! Token Types
//!
//! The access token value object, its refresh policy and its flat
//! string-map form used by account stores.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{require_non_empty, OAuth2Error, ValidationError};

/// Map key for the token value.
pub const TOKEN_KEY: &str = "Token";
/// Map key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "RefreshToken";
/// Map key for the granted scope.
pub const SCOPE_KEY: &str = "Scope";
/// Map key for the token type.
pub const TOKEN_TYPE_KEY: &str = "TokenType";
/// Map key for the expiration date.
pub const EXPIRATION_DATE_KEY: &str = "ExpirationDate";

/// An OAuth2 access token.
///
/// `token` and `token_type` are always non-empty. A token without an
/// expiration date never expires.
#[derive(Clone)]
pub struct AccessToken {
    token: SecretString,
    token_type: String,
    scope: Option<String>,
    expiration_date: Option<DateTime<Utc>>,
    refresh_token: Option<SecretString>,
}

impl AccessToken {
    /// Create new access token.
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        scope: Option<String>,
        expiration_date: Option<DateTime<Utc>>,
        refresh_token: Option<String>,
    ) -> Result<Self, OAuth2Error> {
        let token = token.into();
        let token_type = token_type.into();
        require_non_empty(&token, "token")?;
        require_non_empty(&token_type, "token_type")?;

        Ok(Self {
            token: SecretString::new(token),
            token_type,
            scope,
            expiration_date,
            refresh_token: refresh_token.map(SecretString::new),
        })
    }

    /// Token value.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Token type, e.g. `bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Granted scope.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Absolute expiration time.
    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    /// Refresh token.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token.expose_secret())
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        self.expiration_date
            .map(|exp| exp <= Utc::now())
            .unwrap_or(false)
    }

    /// Whether the token has expired or expires within `window`.
    pub fn should_be_refreshed(&self, window: Duration) -> bool {
        self.should_be_refreshed_at(Utc::now(), window)
    }

    /// [`should_be_refreshed`](Self::should_be_refreshed) evaluated at `now`.
    pub fn should_be_refreshed_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Some(expiration_date) = self.expiration_date else {
            return false;
        };
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);

        expiration_date <= now || expiration_date - now <= window
    }

    /// Replace a missing refresh token with `previous`.
    pub(crate) fn or_refresh_token(mut self, previous: Option<&str>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.map(|t| SecretString::new(t.to_string()));
        }
        self
    }

    /// Flatten into the string map persisted by account stores.
    ///
    /// Absent optional fields are omitted rather than written as empty strings.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(TOKEN_KEY.to_string(), self.token().to_string());
        map.insert(TOKEN_TYPE_KEY.to_string(), self.token_type.clone());
        if let Some(refresh_token) = self.refresh_token() {
            map.insert(REFRESH_TOKEN_KEY.to_string(), refresh_token.to_string());
        }
        if let Some(scope) = &self.scope {
            map.insert(SCOPE_KEY.to_string(), scope.clone());
        }
        if let Some(expiration_date) = self.expiration_date {
            map.insert(
                EXPIRATION_DATE_KEY.to_string(),
                format_expiration_date(expiration_date),
            );
        }
        map
    }

    /// Rebuild a token from its string map. Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, OAuth2Error> {
        let token = required_entry(map, TOKEN_KEY)?;
        let token_type = required_entry(map, TOKEN_TYPE_KEY)?;
        let expiration_date = optional_entry(map, EXPIRATION_DATE_KEY)
            .map(parse_expiration_date)
            .transpose()?;

        Self::new(
            token,
            token_type,
            optional_entry(map, SCOPE_KEY).map(str::to_string),
            expiration_date,
            optional_entry(map, REFRESH_TOKEN_KEY).map(str::to_string),
        )
    }
}

/// Empty values count as absent; older entries store "" for unset fields.
fn optional_entry<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn required_entry<'a>(map: &'a HashMap<String, String>, key: &str) -> Result<&'a str, OAuth2Error> {
    match map.get(key) {
        None => Err(ValidationError::MissingField {
            field: key.to_string(),
        }
        .into()),
        Some(value) if value.is_empty() => Err(ValidationError::EmptyField {
            field: key.to_string(),
        }
        .into()),
        Some(value) => Ok(value.as_str()),
    }
}

/// Sortable RFC 3339 UTC timestamp, e.g. `2013-03-25T02:00:12Z`.
pub fn format_expiration_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an expiration date written by [`format_expiration_date`].
///
/// Zone-less values such as `2013-03-25T02:00:12` are read as UTC.
pub fn parse_expiration_date(value: &str) -> Result<DateTime<Utc>, OAuth2Error> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| {
            ValidationError::InvalidTimestamp {
                value: value.to_string(),
                message: e.to_string(),
            }
            .into()
        })
}

impl TryFrom<&HashMap<String, String>> for AccessToken {
    type Error = OAuth2Error;

    fn try_from(map: &HashMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
            && self.token_type == other.token_type
            && self.scope == other.scope
            && self.expiration_date == other.expiration_date
            && self.refresh_token() == other.refresh_token()
    }
}

impl Eq for AccessToken {}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expiration_date", &self.expiration_date)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

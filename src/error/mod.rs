//! OAuth2 Error Types
//!
//! Error hierarchy for token acquisition, decoding and storage.

use std::time::Duration;
use thiserror::Error;

/// Root error type for token operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuth2Error {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Grant rejected by authorization server: {description}")]
    Grant { description: String },

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Operation canceled")]
    Canceled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl OAuth2Error {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "OAUTH2_PRECONDITION",
            Self::Validation(_) => "OAUTH2_VALIDATION",
            Self::Grant { .. } => "OAUTH2_GRANT",
            Self::Http { .. } => "OAUTH2_HTTP",
            Self::Transport(_) => "OAUTH2_TRANSPORT",
            Self::Canceled => "OAUTH2_CANCELED",
            Self::Storage(_) => "OAUTH2_STORAGE",
            Self::Token(_) => "OAUTH2_TOKEN",
        }
    }

    /// Check if the caller may retry the operation.
    ///
    /// Only transport failures qualify. The crate itself never retries;
    /// backoff policy belongs to the host application.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the operation ended because the caller canceled it.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if a stored token could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(StorageError::NotFound { .. }))
    }

    /// Check if error requires the user to sign in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Token(TokenError::Expired) | Self::Token(TokenError::NoRefreshToken)
        ) || matches!(self, Self::Http { status: 401, .. })
    }
}

/// Invalid or missing required input, raised before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Required argument `{name}` must not be empty")]
    EmptyArgument { name: String },

    #[error("Required argument `{name}` is missing")]
    MissingArgument { name: String },

    #[error("Argument `{name}` is invalid: {message}")]
    InvalidArgument { name: String, message: String },
}

/// Well-formed but semantically incomplete domain data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Field `{field}` must not be empty")]
    EmptyField { field: String },

    #[error("Invalid timestamp `{value}`: {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },
}

/// Network/transport failure reported by (or around) the HTTP executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Request could not be started: {message}")]
    InitiationFailed { message: String },

    #[error("Executor dropped the request without completing it")]
    CallbackDropped,

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl TransportError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InitiationFailed { .. })
    }
}

/// Account store error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("No token stored for `{account}` in service `{service}`")]
    NotFound { account: String, service: String },

    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },
}

/// Token lifecycle error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Result type for token operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Fail with [`PreconditionError::EmptyArgument`] when `value` is empty.
pub(crate) fn require_non_empty(value: &str, name: &str) -> Result<(), OAuth2Error> {
    if value.is_empty() {
        return Err(PreconditionError::EmptyArgument {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

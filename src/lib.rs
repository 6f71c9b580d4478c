//! OAuth2 Token Client
//!
//! Access token acquisition, refresh and persistence for client applications.
//!
//! # Features
//!
//! - Resource Owner Password Credentials Grant (RFC 6749 Section 4.3)
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Token Refresh (RFC 6749 Section 6)
//! - Cancelable requests over a callback-style HTTP executor
//! - Token persistence in a secure account store, namespaced per user and client
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_token_client::{server_config, CredentialStore, InMemoryAccountStore, TokenClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = server_config()
//!         .base_url("https://auth.example.com")
//!         .token_endpoint("/oauth/token")
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .build()?;
//!
//!     let client = TokenClient::new(config)?;
//!     let cancel = CancellationToken::new();
//!
//!     let token = client
//!         .get_user_access_token("alice", "password", Some("read"), &cancel)
//!         .await?;
//!
//!     let store = CredentialStore::new(Arc::new(InMemoryAccountStore::new()));
//!     store.save_user_access_token("alice", "my-service", &token).await?;
//!
//!     println!("Authorization: {}", token.authorization_header());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: access token, token responses and server configuration
//! - `error`: error hierarchy
//! - `core`: HTTP executor capability and the cancelable request bridge
//! - `requests`: form-encoded grant requests
//! - `token`: account store, credential store and token manager
//! - `builders`: fluent builder for configuration
//! - `client`: token client for the three grants

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod requests;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{token_client, TokenClient};

// Re-export builders
pub use builders::{server_config, ServerConfigurationBuilder};

// Re-export errors
pub use error::{
    OAuth2Error, OAuth2Result, PreconditionError, StorageError, TokenError, TransportError,
    ValidationError,
};

// Re-export types
pub use types::{
    // Config
    ServerConfiguration, DEFAULT_REFRESH_WINDOW, DEFAULT_TIMEOUT,
    // Token
    format_expiration_date, parse_expiration_date, AccessToken,
    // Response
    decode_token_response, decode_token_response_at, TokenErrorResponse, TokenResponse,
};

// Re-export core components
pub use crate::core::{
    // Transport
    create_executor, create_mock_executor, CompletionCallback, ExecutionHandle, ExecutionResult,
    HttpExecutor, HttpMethod, HttpRequest, HttpResponse, MockHttpExecutor, ReqwestHttpExecutor,
    // Bridge
    execute, execute_response,
};

// Re-export requests
pub use requests::{
    ClientCredentialsGrantRequest, GrantRequest, PasswordGrantRequest, RefreshTokenGrantRequest,
};

// Re-export token management
pub use token::{
    // Account Store
    create_in_memory_account_store, create_mock_account_store, Account, AccountStore,
    InMemoryAccountStore, MockAccountStore,
    // Credential Store
    CredentialStore,
    // Token Manager
    TokenManager,
};

pub use tokio_util::sync::CancellationToken;

//! Token Client
//!
//! Requests access tokens from the configured token endpoint.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{bridge, create_executor, HttpExecutor, ReqwestHttpExecutor};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::requests::{
    ClientCredentialsGrantRequest, GrantRequest, PasswordGrantRequest, RefreshTokenGrantRequest,
};
use crate::types::{decode_token_response, AccessToken, ServerConfiguration};

/// Client for the password, client credentials and refresh token grants.
///
/// Stateless per call; concurrent requests are independent.
pub struct TokenClient<E: HttpExecutor = ReqwestHttpExecutor> {
    config: ServerConfiguration,
    executor: Arc<E>,
}

impl TokenClient<ReqwestHttpExecutor> {
    /// Create a client backed by reqwest.
    pub fn new(config: ServerConfiguration) -> Result<Self, OAuth2Error> {
        let executor = create_executor(config.timeout())?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }
}

impl<E: HttpExecutor> TokenClient<E> {
    /// Create a client with a custom executor.
    pub fn with_executor(config: ServerConfiguration, executor: Arc<E>) -> Self {
        Self { config, executor }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfiguration {
        &self.config
    }

    /// Request a token for a user with the resource owner password grant.
    pub async fn get_user_access_token(
        &self,
        username: &str,
        password: &str,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let grant = PasswordGrantRequest::new(
            username,
            password,
            self.config.client_id(),
            scope.map(str::to_string),
        )?;
        self.request_token(&grant, cancel).await
    }

    /// Request a token for this client with the client credentials grant.
    pub async fn get_client_access_token(
        &self,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let grant = ClientCredentialsGrantRequest::new(
            self.config.client_id(),
            self.config.client_secret(),
            scope.map(str::to_string),
        )?;
        self.request_token(&grant, cancel).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let grant = RefreshTokenGrantRequest::new(
            refresh_token,
            self.config.client_id(),
            self.config.client_secret(),
        )?;
        self.request_token(&grant, cancel).await
    }

    async fn request_token(
        &self,
        grant: &dyn GrantRequest,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let grant_type = grant.grant_type();
        let mut request = grant.to_http_request(Some(self.config.token_url()))?;
        request.timeout = self.config.timeout();

        tracing::debug!(grant_type, url = %self.config.token_url(), "requesting access token");

        let result = bridge::execute(
            self.executor.as_ref(),
            request,
            |response| decode_token_response(&response.body),
            cancel,
        )
        .await;

        match &result {
            Ok(token) => tracing::debug!(
                grant_type,
                token_type = token.token_type(),
                expires_at = ?token.expiration_date(),
                "access token issued"
            ),
            Err(OAuth2Error::Canceled) => tracing::debug!(grant_type, "token request canceled"),
            Err(error) => tracing::warn!(
                grant_type,
                error_code = error.error_code(),
                error = %error,
                "token request failed"
            ),
        }

        result
    }
}

impl<E: HttpExecutor> Clone for TokenClient<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<E: HttpExecutor> std::fmt::Debug for TokenClient<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Create a token client with the default executor.
pub fn token_client(config: ServerConfiguration) -> Result<TokenClient, OAuth2Error> {
    TokenClient::new(config)
}

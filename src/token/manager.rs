//! Token Manager
//!
//! Combines [`TokenClient`] and [`CredentialStore`]: hands out stored tokens
//! and renews them once they fall within the configured refresh window.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::TokenClient;
use crate::core::{HttpExecutor, ReqwestHttpExecutor};
use crate::error::{require_non_empty, OAuth2Result, TokenError};
use crate::token::credentials::CredentialStore;
use crate::token::store::{AccountStore, InMemoryAccountStore};
use crate::types::AccessToken;

/// Token lifecycle manager.
pub struct TokenManager<E: HttpExecutor = ReqwestHttpExecutor, S: AccountStore = InMemoryAccountStore>
{
    client: TokenClient<E>,
    credentials: Arc<CredentialStore<S>>,
}

impl<E: HttpExecutor, S: AccountStore> TokenManager<E, S> {
    /// Create new token manager.
    pub fn new(client: TokenClient<E>, credentials: Arc<CredentialStore<S>>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn client(&self) -> &TokenClient<E> {
        &self.client
    }

    pub fn credentials(&self) -> &Arc<CredentialStore<S>> {
        &self.credentials
    }

    /// Stored token for `username`, refreshed first if it is due.
    ///
    /// Fails with a not-found storage error when nothing is stored and with
    /// [`TokenError::NoRefreshToken`] when a due token cannot be refreshed.
    pub async fn user_access_token(
        &self,
        username: &str,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let token = self
            .credentials
            .get_user_access_token(username, service_id)
            .await?;

        if !self.is_due(&token) {
            return Ok(token);
        }

        let refresh_token = token.refresh_token().ok_or(TokenError::NoRefreshToken)?;
        tracing::debug!(service_id, "refreshing user access token");

        let refreshed = self
            .client
            .refresh_token(refresh_token, cancel)
            .await?
            .or_refresh_token(Some(refresh_token));

        self.credentials
            .save_user_access_token(username, service_id, &refreshed)
            .await?;
        Ok(refreshed)
    }

    /// Stored client token, or a newly issued one when absent or due.
    pub async fn client_access_token(
        &self,
        scope: Option<&str>,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        let client_id = self.client.config().client_id();

        match self
            .credentials
            .get_client_access_token(client_id, service_id)
            .await
        {
            Ok(token) if !self.is_due(&token) => return Ok(token),
            Ok(_) => tracing::debug!(service_id, "stored client access token is due"),
            Err(error) if error.is_not_found() => {
                tracing::debug!(service_id, "no stored client access token")
            }
            Err(error) => return Err(error),
        }

        let token = self.client.get_client_access_token(scope, cancel).await?;
        self.credentials
            .save_client_access_token(client_id, service_id, &token)
            .await?;
        Ok(token)
    }

    /// Authenticate a user with the password grant and store the token.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        scope: Option<&str>,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> OAuth2Result<AccessToken> {
        require_non_empty(service_id, "service_id")?;

        let token = self
            .client
            .get_user_access_token(username, password, scope, cancel)
            .await?;
        self.credentials
            .save_user_access_token(username, service_id, &token)
            .await?;

        tracing::debug!(service_id, "user signed in");
        Ok(token)
    }

    fn is_due(&self, token: &AccessToken) -> bool {
        token.should_be_refreshed(self.client.config().refresh_window())
    }
}

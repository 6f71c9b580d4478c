//! Credential Store
//!
//! Persists access tokens in an [`AccountStore`], keyed by a namespaced
//! identifier per service id. Users are stored under `user:<username>` and
//! clients under `client:<client id>`, so a user and a client sharing the
//! same name never collide.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::core::lock;
use crate::error::{require_non_empty, OAuth2Error, OAuth2Result, StorageError};
use crate::token::store::{Account, AccountStore};
use crate::types::AccessToken;

/// Identifier prefix for user tokens.
pub const USER_PREFIX: &str = "user:";

/// Identifier prefix for client tokens.
pub const CLIENT_PREFIX: &str = "client:";

/// Access token persistence on top of an account store.
pub struct CredentialStore<S: AccountStore> {
    store: Arc<S>,
    save_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: AccountStore> CredentialStore<S> {
    /// Create new credential store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            save_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying account store.
    pub fn account_store(&self) -> &Arc<S> {
        &self.store
    }

    /// Load the token stored for a user.
    pub async fn get_user_access_token(
        &self,
        username: &str,
        service_id: &str,
    ) -> OAuth2Result<AccessToken> {
        require_non_empty(username, "username")?;
        require_non_empty(service_id, "service_id")?;
        self.get(&namespaced(USER_PREFIX, username), service_id)
            .await
    }

    /// Store a user's token, replacing any previous one.
    pub async fn save_user_access_token(
        &self,
        username: &str,
        service_id: &str,
        token: &AccessToken,
    ) -> OAuth2Result<()> {
        require_non_empty(username, "username")?;
        require_non_empty(service_id, "service_id")?;
        self.save(namespaced(USER_PREFIX, username), service_id, token)
            .await
    }

    /// Remove a user's token. Returns `false` if none was stored.
    pub async fn delete_user_access_token(
        &self,
        username: &str,
        service_id: &str,
    ) -> OAuth2Result<bool> {
        require_non_empty(username, "username")?;
        require_non_empty(service_id, "service_id")?;
        self.delete(&namespaced(USER_PREFIX, username), service_id)
            .await
    }

    /// Load the token stored for a client.
    pub async fn get_client_access_token(
        &self,
        client_id: &str,
        service_id: &str,
    ) -> OAuth2Result<AccessToken> {
        require_non_empty(client_id, "client_id")?;
        require_non_empty(service_id, "service_id")?;
        self.get(&namespaced(CLIENT_PREFIX, client_id), service_id)
            .await
    }

    /// Store a client's token, replacing any previous one.
    pub async fn save_client_access_token(
        &self,
        client_id: &str,
        service_id: &str,
        token: &AccessToken,
    ) -> OAuth2Result<()> {
        require_non_empty(client_id, "client_id")?;
        require_non_empty(service_id, "service_id")?;
        self.save(namespaced(CLIENT_PREFIX, client_id), service_id, token)
            .await
    }

    /// Remove a client's token. Returns `false` if none was stored.
    pub async fn delete_client_access_token(
        &self,
        client_id: &str,
        service_id: &str,
    ) -> OAuth2Result<bool> {
        require_non_empty(client_id, "client_id")?;
        require_non_empty(service_id, "service_id")?;
        self.delete(&namespaced(CLIENT_PREFIX, client_id), service_id)
            .await
    }

    async fn find(&self, identifier: &str, service_id: &str) -> OAuth2Result<Option<Account>> {
        let accounts = self.store.find_accounts_for_service(service_id).await?;
        // The newest entry wins while a save is still collapsing duplicates.
        Ok(accounts
            .into_iter()
            .rev()
            .find(|account| account.is_named(identifier)))
    }

    async fn get(&self, identifier: &str, service_id: &str) -> OAuth2Result<AccessToken> {
        let account = self.find(identifier, service_id).await?.ok_or_else(|| {
            StorageError::NotFound {
                account: identifier.to_string(),
                service: service_id.to_string(),
            }
        })?;

        tracing::debug!(service_id, account = identifier, "loaded stored access token");
        AccessToken::from_map(&account.properties)
    }

    async fn save(
        &self,
        identifier: String,
        service_id: &str,
        token: &AccessToken,
    ) -> OAuth2Result<()> {
        let _guard = self.lock_service(service_id).await;

        self.store
            .save(Account::new(identifier.as_str(), token.to_map()), service_id)
            .await?;

        // Backends without replace-on-save keep older entries ahead of the new one.
        let matching: Vec<Account> = self
            .store
            .find_accounts_for_service(service_id)
            .await?
            .into_iter()
            .filter(|account| account.is_named(&identifier))
            .collect();
        if let Some((_, stale)) = matching.split_last() {
            for account in stale {
                self.store.delete(account, service_id).await?;
            }
        }

        tracing::debug!(service_id, account = %identifier, "saved access token");
        Ok(())
    }

    async fn delete(&self, identifier: &str, service_id: &str) -> OAuth2Result<bool> {
        let _guard = self.lock_service(service_id).await;

        let Some(account) = self.find(identifier, service_id).await? else {
            return Ok(false);
        };
        let removed = self.store.delete(&account, service_id).await?;

        tracing::debug!(service_id, account = identifier, removed, "deleted access token");
        Ok(removed)
    }

    async fn lock_service<'a>(&'a self, service_id: &'a str) -> ServiceGuard<'a> {
        let service_lock = lock(&self.save_locks)
            .entry(service_id.to_string())
            .or_default()
            .clone();
        let guard = service_lock.lock_owned().await;

        ServiceGuard {
            locks: &self.save_locks,
            service_id,
            guard: Some(guard),
        }
    }
}

/// Holds a service's write lock and forgets the lock once nobody else uses it.
struct ServiceGuard<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    service_id: &'a str,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ServiceGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = lock(self.locks);
        let unused = locks
            .get(self.service_id)
            .is_some_and(|service_lock| Arc::strong_count(service_lock) == 1);
        if unused {
            locks.remove(self.service_id);
        }
    }
}

fn namespaced(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

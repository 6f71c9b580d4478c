//! Account Store
//!
//! The secure key-value account store tokens are persisted in. Platform
//! keychains implement [`AccountStore`]; an in-memory implementation and a
//! recording mock are provided here.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::lock;
use crate::error::{OAuth2Error, StorageError};

/// A named property map held by an account store under a service id.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Account name, unique per service (case-insensitive).
    pub username: String,
    /// Stored properties.
    pub properties: HashMap<String, String>,
}

impl Account {
    /// Create new account.
    pub fn new(username: impl Into<String>, properties: HashMap<String, String>) -> Self {
        Self {
            username: username.into(),
            properties,
        }
    }

    /// Case-insensitive username comparison.
    pub fn is_named(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.properties.keys().collect();
        keys.sort();
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("properties", &keys)
            .finish()
    }
}

/// Secure account store interface.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// List all accounts stored under a service, oldest first.
    async fn find_accounts_for_service(&self, service_id: &str)
        -> Result<Vec<Account>, OAuth2Error>;

    /// Store an account under a service, replacing any account with the same name.
    async fn save(&self, account: Account, service_id: &str) -> Result<(), OAuth2Error>;

    /// Delete one stored entry equal to `account` (name compared
    /// case-insensitively). Returns whether an entry was removed.
    async fn delete(&self, account: &Account, service_id: &str) -> Result<bool, OAuth2Error>;
}

/// In-memory account store.
pub struct InMemoryAccountStore {
    services: Mutex<HashMap<String, Vec<Account>>>,
}

impl InMemoryAccountStore {
    /// Create new in-memory account store.
    pub fn new() -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_accounts_for_service(
        &self,
        service_id: &str,
    ) -> Result<Vec<Account>, OAuth2Error> {
        Ok(lock(&self.services)
            .get(service_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, account: Account, service_id: &str) -> Result<(), OAuth2Error> {
        let mut services = lock(&self.services);
        let accounts = services.entry(service_id.to_string()).or_default();
        accounts.retain(|existing| !existing.is_named(&account.username));
        accounts.push(account);
        Ok(())
    }

    async fn delete(&self, account: &Account, service_id: &str) -> Result<bool, OAuth2Error> {
        let mut services = lock(&self.services);
        let Some(accounts) = services.get_mut(service_id) else {
            return Ok(false);
        };
        Ok(remove_first_equal(accounts, account))
    }
}

fn remove_first_equal(accounts: &mut Vec<Account>, account: &Account) -> bool {
    let position = accounts.iter().position(|existing| {
        existing.is_named(&account.username) && existing.properties == account.properties
    });
    match position {
        Some(index) => {
            accounts.remove(index);
            true
        }
        None => false,
    }
}

/// Mock account store for testing.
///
/// Records every call and can inject failures. In append-only mode `save`
/// never replaces existing accounts and every operation yields to the
/// scheduler first, modelling a backend without atomic replace.
#[derive(Default)]
pub struct MockAccountStore {
    services: Mutex<HashMap<String, Vec<Account>>>,
    save_history: Mutex<Vec<(String, Account)>>,
    find_history: Mutex<Vec<String>>,
    delete_history: Mutex<Vec<(String, Account)>>,
    next_error: Mutex<Option<OAuth2Error>>,
    should_fail: Mutex<bool>,
    append_only: Mutex<bool>,
}

impl MockAccountStore {
    /// Create new mock account store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set next error to return.
    pub fn set_next_error(&self, error: OAuth2Error) -> &Self {
        *lock(&self.next_error) = Some(error);
        self
    }

    /// Set store to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *lock(&self.should_fail) = should_fail;
        self
    }

    /// Disable replace-on-save.
    pub fn set_append_only(&self, append_only: bool) -> &Self {
        *lock(&self.append_only) = append_only;
        self
    }

    /// Pre-populate an account.
    pub fn add_account(&self, service_id: &str, account: Account) -> &Self {
        lock(&self.services)
            .entry(service_id.to_string())
            .or_default()
            .push(account);
        self
    }

    /// All accounts currently stored under a service.
    pub fn accounts(&self, service_id: &str) -> Vec<Account> {
        lock(&self.services)
            .get(service_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Get save history as (service id, account) pairs.
    pub fn get_save_history(&self) -> Vec<(String, Account)> {
        lock(&self.save_history).clone()
    }

    /// Get the service ids looked up.
    pub fn get_find_history(&self) -> Vec<String> {
        lock(&self.find_history).clone()
    }

    /// Get delete history as (service id, account) pairs.
    pub fn get_delete_history(&self) -> Vec<(String, Account)> {
        lock(&self.delete_history).clone()
    }

    fn check_error(&self) -> Result<(), OAuth2Error> {
        if *lock(&self.should_fail) {
            return Err(OAuth2Error::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }

        if let Some(error) = lock(&self.next_error).take() {
            return Err(error);
        }

        Ok(())
    }

    async fn maybe_yield(&self) {
        let append_only = *lock(&self.append_only);
        if append_only {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl AccountStore for MockAccountStore {
    async fn find_accounts_for_service(
        &self,
        service_id: &str,
    ) -> Result<Vec<Account>, OAuth2Error> {
        self.maybe_yield().await;
        self.check_error()?;

        lock(&self.find_history).push(service_id.to_string());
        Ok(self.accounts(service_id))
    }

    async fn save(&self, account: Account, service_id: &str) -> Result<(), OAuth2Error> {
        self.maybe_yield().await;
        self.check_error()?;

        lock(&self.save_history).push((service_id.to_string(), account.clone()));

        let append_only = *lock(&self.append_only);
        let mut services = lock(&self.services);
        let accounts = services.entry(service_id.to_string()).or_default();
        if !append_only {
            accounts.retain(|existing| !existing.is_named(&account.username));
        }
        accounts.push(account);
        Ok(())
    }

    async fn delete(&self, account: &Account, service_id: &str) -> Result<bool, OAuth2Error> {
        self.maybe_yield().await;
        self.check_error()?;

        lock(&self.delete_history).push((service_id.to_string(), account.clone()));

        let mut services = lock(&self.services);
        let Some(accounts) = services.get_mut(service_id) else {
            return Ok(false);
        };
        Ok(remove_first_equal(accounts, account))
    }
}

/// Create in-memory account store.
pub fn create_in_memory_account_store() -> InMemoryAccountStore {
    InMemoryAccountStore::new()
}

/// Create mock account store for testing.
pub fn create_mock_account_store() -> MockAccountStore {
    MockAccountStore::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, token: &str) -> Account {
        let mut properties = HashMap::new();
        properties.insert("Token".to_string(), token.to_string());
        Account::new(name, properties)
    }

    #[tokio::test]
    async fn test_in_memory_save_and_find() {
        let store = InMemoryAccountStore::new();

        store.save(account("user:alice", "t1"), "svc").await.unwrap();
        store.save(account("user:bob", "t2"), "svc").await.unwrap();
        store.save(account("user:carol", "t3"), "other").await.unwrap();

        let accounts = store.find_accounts_for_service("svc").await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(store
            .find_accounts_for_service("missing")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_save_replaces_case_insensitively() {
        let store = InMemoryAccountStore::new();

        store.save(account("user:Alice", "old"), "svc").await.unwrap();
        store.save(account("user:alice", "new"), "svc").await.unwrap();

        let accounts = store.find_accounts_for_service("svc").await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].properties["Token"], "new");
    }

    #[tokio::test]
    async fn test_in_memory_delete() {
        let store = InMemoryAccountStore::new();
        let alice = account("user:alice", "t1");

        store.save(alice.clone(), "svc").await.unwrap();
        assert!(store.delete(&alice, "svc").await.unwrap());
        assert!(!store.delete(&alice, "svc").await.unwrap());
        assert!(!store.delete(&alice, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_matching_entry() {
        let store = MockAccountStore::new();
        store.set_append_only(true);
        let old = account("user:Alice", "old");

        store.save(old.clone(), "svc").await.unwrap();
        store.save(account("user:alice", "new"), "svc").await.unwrap();
        store.save(old.clone(), "svc").await.unwrap();

        assert!(store.delete(&account("user:ALICE", "old"), "svc").await.unwrap());

        let remaining: Vec<String> = store
            .accounts("svc")
            .iter()
            .map(|account| account.properties["Token"].clone())
            .collect();
        assert_eq!(remaining, vec!["new".to_string(), "old".to_string()]);
        assert!(!store.delete(&account("user:alice", "other"), "svc").await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_store_history() {
        let store = MockAccountStore::new();

        store.save(account("user:alice", "t1"), "svc").await.unwrap();
        store.find_accounts_for_service("svc").await.unwrap();

        let history = store.get_save_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0, "svc");
        assert_eq!(history[0].1.username, "user:alice");
        assert_eq!(store.get_find_history(), vec!["svc".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_store_append_only_keeps_duplicates() {
        let store = MockAccountStore::new();
        store.set_append_only(true);

        store.save(account("user:alice", "t1"), "svc").await.unwrap();
        store.save(account("user:alice", "t2"), "svc").await.unwrap();

        assert_eq!(store.accounts("svc").len(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_failure() {
        let store = MockAccountStore::new();
        store.set_should_fail(true);

        let result = store.save(account("user:alice", "t1"), "svc").await;
        assert!(matches!(result, Err(OAuth2Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_mock_store_next_error_is_consumed() {
        let store = MockAccountStore::new();
        store.set_next_error(OAuth2Error::Storage(StorageError::ReadFailed {
            message: "locked".to_string(),
        }));

        assert!(store.find_accounts_for_service("svc").await.is_err());
        assert!(store.find_accounts_for_service("svc").await.is_ok());
    }

    #[test]
    fn test_account_debug_hides_values() {
        let debug = format!("{:?}", account("user:alice", "s3cr3t"));
        assert!(debug.contains("Token"));
        assert!(!debug.contains("s3cr3t"));
    }
}

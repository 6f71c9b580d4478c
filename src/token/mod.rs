//! Token Management
//!
//! Token persistence and lifecycle:
//!
//! - **Account Store**: the secure key-value store tokens are persisted in
//! - **Credential Store**: namespaced user/client token persistence per service
//! - **Token Manager**: stored tokens with refresh inside the refresh window

pub mod credentials;
pub mod manager;
pub mod store;

// Account Store
pub use store::{
    create_in_memory_account_store, create_mock_account_store, Account, AccountStore,
    InMemoryAccountStore, MockAccountStore,
};

// Credential Store
pub use credentials::{CredentialStore, CLIENT_PREFIX, USER_PREFIX};

// Token Manager
pub use manager::TokenManager;

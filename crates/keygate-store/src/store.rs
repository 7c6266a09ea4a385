//! The credential store interface consumed by the auth core.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Account, NewAccount, StoreResult};

/// Shared handle to a [`CredentialStore`] implementation.
///
/// The auth core receives the store by constructor injection and is agnostic
/// to the backing engine.
pub type DynCredentialStore = Arc<dyn CredentialStore>;

/// Repository for account credential operations.
///
/// Implementations must enforce email uniqueness at the storage level:
/// existence pre-checks in the auth core are advisory and do not close the
/// race between concurrent registrations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds an account by email address.
    ///
    /// Email comparison is exact; callers are expected to normalize.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Finds an account by its unique identifier.
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>>;

    /// Finds an account matching both email and identifier.
    ///
    /// Used when validating refresh-token claims against the live store so
    /// that a token referencing a deleted or re-created account is rejected.
    async fn find_by_email_and_id(&self, email: &str, id: i64) -> StoreResult<Option<Account>>;

    /// Inserts a new account, assigning its identifier.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] when an account with the
    /// same email already exists.
    ///
    /// [`StoreError::DuplicateEmail`]: crate::StoreError::DuplicateEmail
    async fn insert(&self, new_account: NewAccount) -> StoreResult<Account>;

    /// Replaces the password hash of an existing account.
    ///
    /// The replacement is atomic with respect to concurrent reads. Fails
    /// with [`StoreError::NotFound`] when the account does not exist.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn update_password_hash(&self, id: i64, new_hash: &str) -> StoreResult<()>;
}

//! In-memory credential store engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Account, CredentialStore, NewAccount, StoreError, StoreResult};

/// Tracing target for in-memory store operations.
const TRACING_TARGET: &str = "keygate_store::memory";

/// Thread-safe in-memory [`CredentialStore`].
///
/// Accounts are held behind a single `RwLock`; inserts run inside the write
/// critical section, which makes the email uniqueness check and the insert
/// atomic with respect to concurrent registrations.
#[derive(Debug, Clone, Default)]
#[must_use = "stores do nothing unless you use them"]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<i64, Account>,
    ids_by_email: HashMap<String, i64>,
    next_id: i64,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored accounts.
    pub async fn len(&self) -> usize {
        self.inner.read().await.accounts.len()
    }

    /// Returns `true` if the store holds no accounts.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let inner = self.inner.read().await;
        let account = inner
            .ids_by_email
            .get(email)
            .and_then(|id| inner.accounts.get(id))
            .cloned();
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn find_by_email_and_id(&self, email: &str, id: i64) -> StoreResult<Option<Account>> {
        let inner = self.inner.read().await;
        let account = inner
            .accounts
            .get(&id)
            .filter(|account| account.email == email)
            .cloned();
        Ok(account)
    }

    async fn insert(&self, new_account: NewAccount) -> StoreResult<Account> {
        let mut inner = self.inner.write().await;

        if inner.ids_by_email.contains_key(&new_account.email) {
            return Err(StoreError::DuplicateEmail {
                email: new_account.email,
            });
        }

        inner.next_id += 1;
        let id = inner.next_id;

        let account = new_account.into_account(id);
        inner.ids_by_email.insert(account.email.clone(), id);
        inner.accounts.insert(id, account.clone());

        tracing::debug!(
            target: TRACING_TARGET,
            account_id = id,
            "account inserted"
        );

        Ok(account)
    }

    async fn update_password_hash(&self, id: i64, new_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;

        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.password_hash = new_hash.to_string();
        account.updated_at = jiff::Timestamp::now();

        tracing::debug!(
            target: TRACING_TARGET,
            account_id = id,
            "password hash replaced"
        );

        Ok(())
    }
}

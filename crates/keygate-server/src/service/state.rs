//! Application state and dependency injection.

use std::sync::Arc;

use keygate_store::{DynCredentialStore, MemoryStore};

use crate::Result;
use crate::service::{AuthService, CookieConfig, PasswordHasher, ServiceConfig, TokenCodec};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    store: DynCredentialStore,
    auth_service: AuthService,
    cookie_config: CookieConfig,
}

impl ServiceState {
    /// Initializes application state from configuration with the in-memory
    /// credential store.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store: DynCredentialStore = Arc::new(MemoryStore::new());
        Self::with_store(config, store)
    }

    /// Initializes application state from configuration over an explicit
    /// credential store.
    pub fn with_store(config: &ServiceConfig, store: DynCredentialStore) -> Result<Self> {
        config.validate()?;

        let codec = TokenCodec::from_config(config)?;
        let auth_service = AuthService::new(store.clone(), PasswordHasher::new(), codec);

        Ok(Self {
            store,
            auth_service,
            cookie_config: config.cookie_config(),
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(store: DynCredentialStore);
impl_di!(auth_service: AuthService);
impl_di!(cookie_config: CookieConfig);

//! The auth core: registration, login, refresh rotation and password change.
//!
//! [`AuthService`] orchestrates the credential store, the password hasher
//! and the token codec. All collaborators arrive by constructor injection;
//! the service holds no mutable state of its own and every operation is
//! request-scoped.

mod error;

use std::sync::Arc;

use keygate_store::{DynCredentialStore, NewAccount, StoreError};
use serde::Serialize;

use crate::service::security::{PasswordHasher, TokenClaims, TokenCodec, TokenError, TokenKind};

pub use self::error::AuthError;

/// Tracing target for auth core operations.
const TRACING_TARGET: &str = "keygate_server::service::auth";

/// The token pair returned by login and refresh.
///
/// The access token goes into the response body for bearer-header use; the
/// refresh token must only ever be placed in the http-only cookie by the
/// handler layer, never in a body readable by client-side script.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Always `"bearer"`.
    pub token_type: &'static str,
}

struct AuthInner {
    store: DynCredentialStore,
    hasher: PasswordHasher,
    codec: TokenCodec,
}

/// Orchestrates registration, login, refresh rotation and password change.
#[derive(Clone)]
#[must_use = "services do nothing unless you use them"]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

impl AuthService {
    /// Creates a new auth service over the given collaborators.
    pub fn new(store: DynCredentialStore, hasher: PasswordHasher, codec: TokenCodec) -> Self {
        let inner = Arc::new(AuthInner {
            store,
            hasher,
            codec,
        });
        Self { inner }
    }

    /// Registers a new account.
    ///
    /// The existence pre-check and the insert are not atomic across
    /// concurrent requests; the store's uniqueness constraint closes that
    /// race and the resulting duplicate error maps to the same
    /// [`AuthError::Registration`] as the pre-check.
    pub async fn register(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let email = email.to_lowercase();

        match self.inner.store.find_by_email(&email).await {
            Ok(Some(_)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    email = %email,
                    "registration failed: email already exists"
                );
                return Err(AuthError::Registration);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "registration failed: store lookup error"
                );
                return Err(AuthError::Registration);
            }
        }

        let password_hash = self
            .hash_password_blocking(password.to_owned())
            .await
            .map_err(|_| AuthError::Registration)?;

        let new_account = NewAccount {
            email,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            password_hash,
        };

        match self.inner.store.insert(new_account).await {
            Ok(account) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    account_id = account.id,
                    "account created"
                );
                Ok(())
            }
            Err(e) => {
                // Includes the duplicate-email race lost to a concurrent insert.
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %e,
                    duplicate = e.is_duplicate(),
                    "registration failed: insert error"
                );
                Err(AuthError::Registration)
            }
        }
    }

    /// Verifies credentials and issues the initial token pair.
    ///
    /// The username is the account email. Unknown users and wrong passwords
    /// return the identical failure; unknown users still pay for a dummy
    /// verification so response timing does not reveal account existence.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let email = username.to_lowercase();

        let account = self.inner.store.find_by_email(&email).await.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %e,
                "login failed: store lookup error"
            );
            AuthError::Internal("credential store unavailable".to_string())
        })?;

        let password_valid = match &account {
            Some(account) => {
                self.verify_password_blocking(password.to_owned(), account.password_hash.clone())
                    .await?
            }
            None => {
                let hasher = self.inner.hasher.clone();
                let password = password.to_owned();
                tokio::task::spawn_blocking(move || hasher.verify_dummy_password(&password))
                    .await
                    .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?
            }
        };

        let Some(account) = account.filter(|_| password_valid) else {
            tracing::warn!(
                target: TRACING_TARGET,
                email = %email,
                "login failed: invalid credentials"
            );
            return Err(AuthError::Authentication(AuthError::BAD_CREDENTIALS));
        };

        let pair = self.issue_pair(&account.email, account.id)?;

        tracing::info!(
            target: TRACING_TARGET,
            account_id = account.id,
            "login successful: token pair issued"
        );

        Ok(pair)
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The subject is re-validated against the live store by both email and
    /// id so a token referencing a deleted or re-created account is
    /// rejected. On success BOTH tokens are re-minted: the presented
    /// refresh token is superseded by the rotated one.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        let token = refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Authentication(AuthError::REFRESH_MISSING))?;

        let claims = self
            .inner
            .codec
            .decode(token, TokenKind::Refresh)
            .map_err(|e| match e {
                TokenError::WrongKind { .. } => {
                    AuthError::Authentication(AuthError::WRONG_TOKEN_TYPE)
                }
                _ => AuthError::Authentication(AuthError::REFRESH_INVALID),
            })?;

        let subject_id = claims
            .subject_id()
            .ok_or(AuthError::Authentication(AuthError::INVALID_PAYLOAD))?;

        let account = self
            .inner
            .store
            .find_by_email_and_id(&claims.subject_email, subject_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "refresh failed: store lookup error"
                );
                AuthError::Internal("credential store unavailable".to_string())
            })?
            .ok_or_else(|| {
                tracing::warn!(
                    target: TRACING_TARGET,
                    account_id = subject_id,
                    "refresh failed: subject no longer exists"
                );
                AuthError::Authentication(AuthError::USER_VANISHED)
            })?;

        let pair = self.issue_pair(&account.email, account.id)?;

        tracing::debug!(
            target: TRACING_TARGET,
            account_id = account.id,
            "refresh successful: token pair rotated"
        );

        Ok(pair)
    }

    /// Changes an account password.
    ///
    /// Each check short-circuits the next; the stored hash is only replaced
    /// once the current password verifies and the confirmation matches.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .inner
            .store
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "password change failed: store lookup error"
                );
                AuthError::Internal("credential store unavailable".to_string())
            })?
            .ok_or(AuthError::UserNotFound)?;

        let current_valid = self
            .verify_password_blocking(current_password.to_owned(), account.password_hash.clone())
            .await?;
        if !current_valid {
            tracing::warn!(
                target: TRACING_TARGET,
                account_id = user_id,
                "password change failed: invalid current password"
            );
            return Err(AuthError::InvalidPassword);
        }

        if new_password != new_password_confirm {
            tracing::warn!(
                target: TRACING_TARGET,
                account_id = user_id,
                "password change failed: confirmation mismatch"
            );
            return Err(AuthError::PasswordMismatch);
        }

        let new_hash = self.hash_password_blocking(new_password.to_owned()).await?;

        self.inner
            .store
            .update_password_hash(user_id, &new_hash)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UserNotFound,
                e => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        error = %e,
                        "password change failed: store update error"
                    );
                    AuthError::Internal("credential store unavailable".to_string())
                }
            })?;

        tracing::info!(
            target: TRACING_TARGET,
            account_id = user_id,
            "password changed"
        );

        Ok(())
    }

    /// Verifies an access token presented as a bearer credential.
    ///
    /// Every decode failure collapses to the unified bad-credentials
    /// message.
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.inner
            .codec
            .decode(token, TokenKind::Access)
            .map_err(|_| AuthError::Authentication(AuthError::BAD_CREDENTIALS))
    }

    /// Mints a fresh access/refresh token pair for the subject.
    fn issue_pair(&self, email: &str, id: i64) -> Result<TokenPair, AuthError> {
        let access_token = self
            .inner
            .codec
            .encode(TokenKind::Access, email, id)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))?;
        let refresh_token = self
            .inner
            .codec
            .encode(TokenKind::Refresh, email, id)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer",
        })
    }

    /// Offloads Argon2 hashing to a blocking task.
    ///
    /// Hashing is CPU-bound and latency-significant; running it inline
    /// would stall the async worker.
    async fn hash_password_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.inner.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    /// Offloads Argon2 verification to a blocking task.
    async fn verify_password_blocking(
        &self,
        password: String,
        stored_hash: String,
    ) -> Result<bool, AuthError> {
        let hasher = self.inner.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::Timestamp;
    use keygate_store::{CredentialStore, MemoryStore};

    use super::*;
    use crate::service::ServiceConfig;

    fn test_service() -> (AuthService, MemoryStore, TokenCodec) {
        let config = ServiceConfig::default();
        let codec = TokenCodec::from_config(&config).expect("default config");
        let store = MemoryStore::new();
        let service = AuthService::new(
            Arc::new(store.clone()),
            PasswordHasher::new(),
            codec.clone(),
        );
        (service, store, codec)
    }

    async fn register_alice(service: &AuthService) {
        service
            .register("alice@example.com", "Alice", "Smith", "correct horse battery")
            .await
            .expect("registration should succeed");
    }

    #[tokio::test]
    async fn register_then_login_issues_valid_pair() -> anyhow::Result<()> {
        let (service, _, codec) = test_service();
        register_alice(&service).await;

        let pair = service
            .login("alice@example.com", "correct horse battery")
            .await?;
        assert_eq!(pair.token_type, "bearer");

        let access = codec.decode(&pair.access_token, TokenKind::Access)?;
        assert_eq!(access.subject_email, "alice@example.com");
        assert_eq!(access.subject_id(), Some(1));

        let refresh = codec.decode(&pair.refresh_token, TokenKind::Refresh)?;
        assert_eq!(refresh.subject_id(), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn register_duplicate_email_fails_and_keeps_one_record() -> anyhow::Result<()> {
        let (service, store, _) = test_service();
        register_alice(&service).await;

        let result = service
            .register("alice@example.com", "Alice", "Smith", "another password")
            .await;
        assert_eq!(result, Err(AuthError::Registration));
        assert_eq!(store.len().await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn register_normalizes_email_case() -> anyhow::Result<()> {
        let (service, _, _) = test_service();
        service
            .register("Alice@Example.COM", "Alice", "Smith", "correct horse battery")
            .await
            .expect("registration should succeed");

        // Login with the lowercase form works, and re-registering the mixed
        // case form is a duplicate.
        service
            .login("alice@example.com", "correct horse battery")
            .await?;
        let result = service
            .register("ALICE@example.com", "Alice", "Smith", "correct horse battery")
            .await;
        assert_eq!(result, Err(AuthError::Registration));

        Ok(())
    }

    #[tokio::test]
    async fn login_wrong_password_and_unknown_user_are_identical() {
        let (service, _, _) = test_service();
        register_alice(&service).await;

        let wrong_password = service
            .login("alice@example.com", "wrong password")
            .await
            .unwrap_err();
        let unknown_user = service
            .login("nobody@example.com", "correct horse battery")
            .await
            .unwrap_err();

        assert_eq!(wrong_password, unknown_user);
        assert_eq!(
            wrong_password,
            AuthError::Authentication(AuthError::BAD_CREDENTIALS)
        );
    }

    #[tokio::test]
    async fn refresh_missing_token_fails() {
        let (service, _, _) = test_service();

        let missing = service.refresh(None).await.unwrap_err();
        assert_eq!(
            missing,
            AuthError::Authentication(AuthError::REFRESH_MISSING)
        );

        let empty = service.refresh(Some("")).await.unwrap_err();
        assert_eq!(empty, AuthError::Authentication(AuthError::REFRESH_MISSING));
    }

    #[tokio::test]
    async fn refresh_invalid_token_fails() {
        let (service, _, _) = test_service();

        let result = service.refresh(Some("not-a-token")).await.unwrap_err();
        assert_eq!(result, AuthError::Authentication(AuthError::REFRESH_INVALID));
    }

    #[tokio::test]
    async fn refresh_rejects_access_kind_token() {
        let (service, _, codec) = test_service();
        register_alice(&service).await;

        // Well-formed token under the refresh secret but tagged as access.
        let claims = TokenClaims {
            subject_email: "alice@example.com".to_string(),
            id: "1".to_string(),
            expires_at: Timestamp::now().as_second() + 600,
            kind: TokenKind::Access,
        };
        let token = codec.sign_for_tests(TokenKind::Refresh, &claims);

        let result = service.refresh(Some(&token)).await.unwrap_err();
        assert_eq!(
            result,
            AuthError::Authentication(AuthError::WRONG_TOKEN_TYPE)
        );
    }

    #[tokio::test]
    async fn refresh_rejects_expired_token() {
        let (service, _, codec) = test_service();
        register_alice(&service).await;

        let claims = TokenClaims {
            subject_email: "alice@example.com".to_string(),
            id: "1".to_string(),
            expires_at: Timestamp::now().as_second() - 600,
            kind: TokenKind::Refresh,
        };
        let token = codec.sign_for_tests(TokenKind::Refresh, &claims);

        let result = service.refresh(Some(&token)).await.unwrap_err();
        assert_eq!(result, AuthError::Authentication(AuthError::REFRESH_INVALID));
    }

    #[tokio::test]
    async fn refresh_rejects_vanished_subject() {
        let (service, _, codec) = test_service();

        // No account was ever created for this subject.
        let claims = TokenClaims {
            subject_email: "ghost@example.com".to_string(),
            id: "7".to_string(),
            expires_at: Timestamp::now().as_second() + 600,
            kind: TokenKind::Refresh,
        };
        let token = codec.sign_for_tests(TokenKind::Refresh, &claims);

        let result = service.refresh(Some(&token)).await.unwrap_err();
        assert_eq!(result, AuthError::Authentication(AuthError::USER_VANISHED));
    }

    #[tokio::test]
    async fn refresh_rotates_the_token_pair() -> anyhow::Result<()> {
        let (service, _, codec) = test_service();
        register_alice(&service).await;

        let initial = service
            .login("alice@example.com", "correct horse battery")
            .await?;
        let rotated = service.refresh(Some(&initial.refresh_token)).await?;

        // Both freshly minted tokens verify, and the rotated refresh token
        // can itself be exchanged again.
        let old_claims = codec.decode(&initial.refresh_token, TokenKind::Refresh)?;
        let new_claims = codec.decode(&rotated.refresh_token, TokenKind::Refresh)?;
        assert!(new_claims.expires_at >= old_claims.expires_at);
        assert_eq!(new_claims.subject_id(), Some(1));

        service.refresh(Some(&rotated.refresh_token)).await?;

        Ok(())
    }

    #[tokio::test]
    async fn change_password_replaces_the_hash() -> anyhow::Result<()> {
        let (service, _, _) = test_service();
        register_alice(&service).await;

        service
            .change_password(1, "correct horse battery", "new password 42", "new password 42")
            .await?;

        let old = service.login("alice@example.com", "correct horse battery").await;
        assert!(old.is_err());
        service.login("alice@example.com", "new password 42").await?;

        Ok(())
    }

    #[tokio::test]
    async fn change_password_wrong_current_keeps_hash() -> anyhow::Result<()> {
        let (service, store, _) = test_service();
        register_alice(&service).await;
        let before = store.find_by_id(1).await?.unwrap().password_hash;

        let result = service
            .change_password(1, "wrong password", "new password 42", "new password 42")
            .await;
        assert_eq!(result, Err(AuthError::InvalidPassword));

        let after = store.find_by_id(1).await?.unwrap().password_hash;
        assert_eq!(before, after);

        Ok(())
    }

    #[tokio::test]
    async fn change_password_mismatched_confirmation_keeps_hash() -> anyhow::Result<()> {
        let (service, store, _) = test_service();
        register_alice(&service).await;
        let before = store.find_by_id(1).await?.unwrap().password_hash;

        let result = service
            .change_password(1, "correct horse battery", "new password 42", "different")
            .await;
        assert_eq!(result, Err(AuthError::PasswordMismatch));

        let after = store.find_by_id(1).await?.unwrap().password_hash;
        assert_eq!(before, after);

        Ok(())
    }

    #[tokio::test]
    async fn change_password_unknown_user_fails() {
        let (service, _, _) = test_service();

        let result = service
            .change_password(99, "whatever", "new password 42", "new password 42")
            .await;
        assert_eq!(result, Err(AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn access_token_verification_round_trip() -> anyhow::Result<()> {
        let (service, _, _) = test_service();
        register_alice(&service).await;

        let pair = service
            .login("alice@example.com", "correct horse battery")
            .await?;
        let claims = service.verify_access_token(&pair.access_token)?;
        assert_eq!(claims.subject_id(), Some(1));

        // A refresh token is never accepted where an access token is expected.
        let result = service.verify_access_token(&pair.refresh_token);
        assert_eq!(
            result,
            Err(AuthError::Authentication(AuthError::BAD_CREDENTIALS))
        );

        Ok(())
    }
}

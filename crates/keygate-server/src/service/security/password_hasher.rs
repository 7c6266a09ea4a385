//! Secure password hashing and verification using Argon2id.
//!
//! Hashes are produced in PHC string format with a fresh random salt per
//! call and verified with a timing-safe comparison. Verification never
//! returns an error to the caller: a malformed stored hash counts as a
//! mismatch so the hasher cannot become a verification oracle.

use argon2::password_hash::{Error as ArgonError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};
use rand::rngs::OsRng;

use crate::service::auth::AuthError;

/// Tracing target for password hashing operations.
const TRACING_TARGET: &str = "keygate_server::service::password_hasher";

/// Secure password hashing and verification service using Argon2id.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Creates a new instance of the [`PasswordHasher`] service.
    pub fn new() -> Self {
        let argon2 = Argon2::default();
        Self { argon2 }
    }

    /// Hashes a password using Argon2id with a cryptographically secure random salt.
    ///
    /// The returned PHC string includes the algorithm, parameters, salt and
    /// digest, and can be stored directly in the credential store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if salt generation or the hashing
    /// operation fails.
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::try_from_rng(&mut OsRng).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %e,
                "failed to generate cryptographically secure salt"
            );

            AuthError::Internal("salt generation failed".to_string())
        })?;

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "password hashing operation failed"
                );

                AuthError::Internal("password hashing failed".to_string())
            })?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash.
    ///
    /// Uses a timing-safe comparison. Returns `false` for incorrect
    /// passwords and for stored hashes that fail to parse; the latter is
    /// logged since it indicates corrupted data rather than a bad login.
    #[must_use]
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %e,
                    "invalid password hash format in store"
                );
                return false;
            }
        };

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => true,
            Err(ArgonError::Password) => false,
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "password verification system error"
                );
                false
            }
        }
    }

    /// Performs a dummy password verification to maintain consistent timing.
    ///
    /// Used when an account doesn't exist so that login attempts against
    /// unknown emails take approximately as long as real verifications,
    /// preventing account enumeration via timing analysis. Always returns
    /// `false`.
    #[must_use]
    pub fn verify_dummy_password(&self, password: &str) -> bool {
        use rand::Rng;

        let password_len = rand::random_range(16..32);
        let dummy_password: String = (0..password_len)
            .map(|_| rand::rng().sample(rand::distr::Alphanumeric) as char)
            .collect();

        // Hash the dummy password and verify, this will always fail
        // but takes the same time as a real verification
        if let Ok(dummy_hash) = self.hash_password(&dummy_password) {
            let _ = self.verify_password(password, &dummy_hash);
        }

        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_password() -> anyhow::Result<()> {
        let hasher = PasswordHasher::new();
        let password = "secure_password_123";
        let hash = hasher.hash_password(password)?;

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password(password, &hash));
        assert!(!hasher.verify_password("wrong_password", &hash));

        Ok(())
    }

    #[test]
    fn hash_produces_unique_salts() -> anyhow::Result<()> {
        let hasher = PasswordHasher::new();
        let password = "test_password";

        let hash1 = hasher.hash_password(password)?;
        let hash2 = hasher.hash_password(password)?;

        assert_ne!(hash1, hash2);
        assert!(hasher.verify_password(password, &hash1));
        assert!(hasher.verify_password(password, &hash2));

        Ok(())
    }

    #[test]
    fn malformed_hash_counts_as_mismatch() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify_password("test_password", "invalid_hash_format"));
        assert!(!hasher.verify_password("test_password", ""));
    }

    #[test]
    fn dummy_verification_always_fails() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify_dummy_password("any_password"));
    }
}

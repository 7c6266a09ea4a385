//! Error types for credential store operations.

/// Type-erased error type for dynamic error handling.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// A specialized [`Result`] type for credential store operations.
///
/// [`Result`]: std::result::Result
pub type StoreResult<T, E = StoreError> = std::result::Result<T, E>;

/// Error type for all credential store operations.
///
/// Backends map their native failures onto these variants so that the auth
/// core never observes a storage-specific error type.
#[derive(Debug, thiserror::Error)]
#[must_use = "store errors should be handled appropriately"]
pub enum StoreError {
    /// An account with the same email address already exists.
    ///
    /// Returned by [`insert`] when the store-level uniqueness constraint on
    /// the email column is violated, including the race where two concurrent
    /// registrations pass the existence pre-check.
    ///
    /// [`insert`]: crate::CredentialStore::insert
    #[error("account with email '{email}' already exists")]
    DuplicateEmail {
        /// The conflicting email address.
        email: String,
    },

    /// The referenced account does not exist.
    #[error("account not found")]
    NotFound,

    /// The backend failed or is unreachable.
    #[error("credential store unavailable")]
    Unavailable(#[source] BoxedError),
}

impl StoreError {
    /// Returns `true` if this error is a uniqueness-constraint violation.
    #[inline]
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEmail { .. })
    }
}

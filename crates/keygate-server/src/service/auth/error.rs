//! Error taxonomy of the auth core.
//!
//! Every lower-level failure (store, hasher, codec) is caught at the auth
//! core boundary and re-raised as one of these kinds; no storage or crypto
//! error type ever crosses into the handler layer.

/// Error type for auth core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[must_use = "auth errors should be handled appropriately"]
pub enum AuthError {
    /// Registration failed.
    ///
    /// Covers duplicate emails and any unexpected persistence failure during
    /// registration; both collapse to one user-facing message.
    #[error("unable to create user")]
    Registration,

    /// Authentication failed.
    ///
    /// Bad credentials, missing/invalid/expired/wrong-kind refresh tokens
    /// and vanished users all surface as this variant. The message never
    /// reveals whether an email exists.
    #[error("{0}")]
    Authentication(&'static str),

    /// The account targeted by a password change does not exist.
    #[error("user not found")]
    UserNotFound,

    /// The current password supplied for a password change is wrong.
    #[error("invalid current password")]
    InvalidPassword,

    /// The new password and its confirmation do not match.
    #[error("new password and confirmation do not match")]
    PasswordMismatch,

    /// Unexpected internal failure (store outage, hashing failure).
    #[error("internal authentication failure: {0}")]
    Internal(String),
}

impl AuthError {
    /// Unified bad-credentials message; identical for unknown emails and
    /// wrong passwords so account existence never leaks.
    pub(crate) const BAD_CREDENTIALS: &'static str = "Could not validate user";

    /// Refresh token cookie absent from the request.
    pub(crate) const REFRESH_MISSING: &'static str = "Refresh token missing";

    /// Refresh token failed signature, shape or expiry checks.
    pub(crate) const REFRESH_INVALID: &'static str = "Invalid refresh token or expired";

    /// Refresh token verified but carries the wrong kind tag.
    pub(crate) const WRONG_TOKEN_TYPE: &'static str = "Invalid token type";

    /// Refresh token claims do not parse into a subject.
    pub(crate) const INVALID_PAYLOAD: &'static str = "Invalid token payload";

    /// Refresh token references an account that no longer exists.
    pub(crate) const USER_VANISHED: &'static str = "User not found";
}

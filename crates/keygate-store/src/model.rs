//! Account models for credential storage.
//!
//! ## Models
//!
//! - [`Account`] - Persisted account record with credentials and timestamps
//! - [`NewAccount`] - Data structure for creating new accounts

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A persisted user account.
///
/// The password is stored only as a one-way hash in PHC string format. The
/// auth core never mutates an account directly except for replacing
/// `password_hash` through [`update_password_hash`].
///
/// [`update_password_hash`]: crate::CredentialStore::update_password_hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: i64,
    /// Primary email used for authentication. Unique across the store.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Password hash in PHC string format.
    pub password_hash: String,
    /// Timestamp when the account was created.
    pub created_at: Timestamp,
    /// Timestamp when the account was last updated.
    pub updated_at: Timestamp,
}

/// Data for creating a new account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAccount {
    /// Primary email used for authentication.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Password hash in PHC string format.
    pub password_hash: String,
}

impl NewAccount {
    /// Materializes the new account into a persisted [`Account`].
    pub(crate) fn into_account(self, id: i64) -> Account {
        let now = Timestamp::now();
        Account {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

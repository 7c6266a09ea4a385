//! Password hashing and token signing primitives.

mod password_hasher;
mod token_codec;

pub use self::password_hasher::PasswordHasher;
pub use self::token_codec::{TokenClaims, TokenCodec, TokenError, TokenKind};

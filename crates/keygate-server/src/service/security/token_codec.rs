//! Stateless, kind-tagged JWT encode/decode.
//!
//! Access and refresh tokens are signed with different secrets; a token of
//! one kind can never be verified with the other kind's key. Every decode
//! checks the embedded `type` claim against the expected kind, and expiry is
//! validated inside the codec rather than by callers.

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::service::ServiceConfig;

/// Tracing target for token codec operations.
const TRACING_TARGET: &str = "keygate_server::service::token_codec";

/// The two token kinds issued by the auth core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential for API calls.
    Access,
    /// Long-lived credential exchanged for new token pairs.
    Refresh,
}

impl TokenKind {
    /// Returns the kind as its wire-format string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed claims carried inside a token.
///
/// Constructed per issuance and never persisted server-side; the tokens are
/// fully stateless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject email address.
    #[serde(rename = "sub")]
    pub subject_email: String,
    /// Subject account id, serialized as a string on the wire.
    pub id: String,
    /// Expiry as a UTC unix timestamp in seconds.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Token kind tag, checked on every decode.
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl TokenClaims {
    /// Parses the subject account id.
    ///
    /// Returns `None` when the claim does not hold a decimal integer.
    #[must_use]
    pub fn subject_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

/// Error type for token encode/decode operations.
///
/// All decode sub-failures (bad signature, expired, malformed) collapse into
/// [`Invalid`] so callers cannot be used as a verification oracle; only the
/// kind mismatch is distinguished because the auth core reports it
/// separately.
///
/// [`Invalid`]: TokenError::Invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature invalid, token malformed, or token expired.
    #[error("invalid or expired token")]
    Invalid,
    /// The token verified but carries the other kind's `type` claim.
    #[error("expected {expected} token, got {actual}")]
    WrongKind {
        /// The kind the caller required.
        expected: TokenKind,
        /// The kind found in the claims.
        actual: TokenKind,
    },
    /// Token signing failed.
    #[error("token encoding failed")]
    Encoding,
}

/// Keys and lifetime for one token kind.
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

struct CodecInner {
    algorithm: Algorithm,
    access: KindKeys,
    refresh: KindKeys,
}

/// Stateless, thread-safe token codec.
///
/// Holds only immutable configuration: the per-kind symmetric keys, the
/// signing algorithm and the default TTLs.
#[derive(Clone)]
#[must_use = "codecs do nothing unless you use them"]
pub struct TokenCodec {
    inner: Arc<CodecInner>,
}

impl TokenCodec {
    /// Creates a codec from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the algorithm is not an HMAC
    /// variant.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let algorithm = config.parse_algorithm()?;

        let access = KindKeys {
            encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            ttl_seconds: config.access_token_expire_minutes * 60,
        };
        let refresh = KindKeys {
            encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            ttl_seconds: config.refresh_token_expire_minutes * 60,
        };

        let inner = Arc::new(CodecInner {
            algorithm,
            access,
            refresh,
        });

        Ok(Self { inner })
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.inner.access,
            TokenKind::Refresh => &self.inner.refresh,
        }
    }

    /// Signs a new token of the given kind for the subject.
    ///
    /// Expiry is set to now plus the kind's configured TTL.
    pub fn encode(&self, kind: TokenKind, email: &str, id: i64) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let claims = TokenClaims {
            subject_email: email.to_owned(),
            id: id.to_string(),
            expires_at: Timestamp::now().as_second() + keys.ttl_seconds,
            kind,
        };

        let header = Header::new(self.inner.algorithm);
        encode(&header, &claims, &keys.encoding).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %e,
                kind = %kind,
                "failed to encode token"
            );

            TokenError::Encoding
        })
    }

    /// Verifies a token and returns its claims.
    ///
    /// The token is verified with the expected kind's key; signature,
    /// expiry and shape failures all map to [`TokenError::Invalid`]. A
    /// token that verifies but carries the wrong `type` claim maps to
    /// [`TokenError::WrongKind`].
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let keys = self.keys(expected);

        let mut validation = Validation::new(self.inner.algorithm);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<TokenClaims>(token, &keys.decoding, &validation).map_err(|e| {
            tracing::debug!(
                target: TRACING_TARGET,
                error = %e,
                expected = %expected,
                "token verification failed"
            );

            TokenError::Invalid
        })?;

        let claims = token_data.claims;
        if claims.kind != expected {
            tracing::warn!(
                target: TRACING_TARGET,
                expected = %expected,
                actual = %claims.kind,
                "token kind mismatch"
            );

            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }

    /// Signs arbitrary claims with the given kind's key.
    ///
    /// Test-only escape hatch for crafting mismatched and expired tokens.
    #[cfg(test)]
    pub(crate) fn sign_for_tests(&self, signing_kind: TokenKind, claims: &TokenClaims) -> String {
        let header = Header::new(self.inner.algorithm);
        encode(&header, claims, &self.keys(signing_kind).encoding)
            .expect("test token encoding should not fail")
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.inner.algorithm)
            .field("access_ttl_seconds", &self.inner.access.ttl_seconds)
            .field("refresh_ttl_seconds", &self.inner.refresh.ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&ServiceConfig::default()).expect("default config")
    }

    #[test]
    fn round_trip_preserves_claims() -> anyhow::Result<()> {
        let codec = codec();
        let token = codec.encode(TokenKind::Access, "user@example.com", 42)?;

        let claims = codec.decode(&token, TokenKind::Access)?;
        assert_eq!(claims.subject_email, "user@example.com");
        assert_eq!(claims.subject_id(), Some(42));
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.expires_at > Timestamp::now().as_second());

        Ok(())
    }

    #[test]
    fn kinds_use_isolated_secrets() -> anyhow::Result<()> {
        let codec = codec();

        let access = codec.encode(TokenKind::Access, "user@example.com", 1)?;
        let refresh = codec.encode(TokenKind::Refresh, "user@example.com", 1)?;

        // An access token never verifies under the refresh key, and vice versa.
        assert_eq!(
            codec.decode(&access, TokenKind::Refresh),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            codec.decode(&refresh, TokenKind::Access),
            Err(TokenError::Invalid)
        );

        Ok(())
    }

    #[test]
    fn expired_token_fails_decode() {
        let codec = codec();
        let claims = TokenClaims {
            subject_email: "user@example.com".to_string(),
            id: "1".to_string(),
            expires_at: Timestamp::now().as_second() - 600,
            kind: TokenKind::Refresh,
        };

        let token = codec.sign_for_tests(TokenKind::Refresh, &claims);
        assert_eq!(
            codec.decode(&token, TokenKind::Refresh),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn wrong_kind_is_distinguished_from_invalid() {
        let codec = codec();

        // Well-formed token signed with the refresh key but tagged as access.
        let claims = TokenClaims {
            subject_email: "user@example.com".to_string(),
            id: "1".to_string(),
            expires_at: Timestamp::now().as_second() + 600,
            kind: TokenKind::Access,
        };

        let token = codec.sign_for_tests(TokenKind::Refresh, &claims);
        assert_eq!(
            codec.decode(&token, TokenKind::Refresh),
            Err(TokenError::WrongKind {
                expected: TokenKind::Refresh,
                actual: TokenKind::Access,
            })
        );
    }

    #[test]
    fn malformed_token_fails_decode() {
        let codec = codec();
        assert_eq!(
            codec.decode("not-a-token", TokenKind::Access),
            Err(TokenError::Invalid)
        );
        assert_eq!(codec.decode("", TokenKind::Refresh), Err(TokenError::Invalid));
    }

    #[test]
    fn non_numeric_subject_id_parses_to_none() {
        let claims = TokenClaims {
            subject_email: "user@example.com".to_string(),
            id: "abc".to_string(),
            expires_at: 0,
            kind: TokenKind::Access,
        };
        assert_eq!(claims.subject_id(), None);
    }
}

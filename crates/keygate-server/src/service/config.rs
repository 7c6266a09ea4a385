//! Environment-sourced service configuration.
//!
//! All settings are read from environment variables (with CLI overrides via
//! clap) and frozen into an immutable [`ServiceConfig`] at startup. The
//! config is passed by reference into the token codec and auth core instead
//! of living in process-wide mutable state.

use axum_extra::extract::cookie::{Cookie, SameSite};
use clap::{Args, ValueEnum};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    /// Default access-token signing secret for development.
    pub const ACCESS_TOKEN_SECRET: &str = "keygate-dev-access-secret";

    /// Default refresh-token signing secret for development.
    pub const REFRESH_TOKEN_SECRET: &str = "keygate-dev-refresh-secret";

    /// Default HMAC signing algorithm.
    pub const TOKEN_ALGORITHM: &str = "HS256";

    /// Default access token lifetime in minutes.
    pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 15;

    /// Default refresh token lifetime in minutes (7 days).
    pub const REFRESH_TOKEN_EXPIRE_MINUTES: i64 = 7 * 24 * 60;

    /// Default name of the refresh token cookie.
    pub const REFRESH_TOKEN_COOKIE_NAME: &str = "app_refresh_token";
}

/// Deployment environment flag.
///
/// Affects the security attributes of the refresh cookie: production turns
/// on `Secure` and `SameSite=Strict`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development or staging.
    #[default]
    Development,
    /// Production-like deployment behind TLS.
    Production,
}

impl Environment {
    /// Returns `true` for production-like environments.
    #[inline]
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Secret used to sign and verify access tokens.
    #[arg(long, env = "ACCESS_TOKEN_SECRET", default_value = defaults::ACCESS_TOKEN_SECRET)]
    pub access_token_secret: String,

    /// Secret used to sign and verify refresh tokens.
    ///
    /// Must differ from the access token secret so that compromise of one
    /// secret cannot forge the other token kind.
    #[arg(long, env = "REFRESH_TOKEN_SECRET", default_value = defaults::REFRESH_TOKEN_SECRET)]
    pub refresh_token_secret: String,

    /// HMAC signing algorithm (HS256, HS384 or HS512).
    #[arg(long, env = "TOKEN_ALGORITHM", default_value = defaults::TOKEN_ALGORITHM)]
    pub token_algorithm: String,

    /// Access token lifetime in minutes.
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = defaults::ACCESS_TOKEN_EXPIRE_MINUTES)]
    pub access_token_expire_minutes: i64,

    /// Refresh token lifetime in minutes.
    #[arg(long, env = "REFRESH_TOKEN_EXPIRE_MINUTES", default_value_t = defaults::REFRESH_TOKEN_EXPIRE_MINUTES)]
    pub refresh_token_expire_minutes: i64,

    /// Name of the cookie carrying the refresh token.
    #[arg(long, env = "REFRESH_TOKEN_COOKIE_NAME", default_value = defaults::REFRESH_TOKEN_COOKIE_NAME)]
    pub refresh_token_cookie_name: String,

    /// Deployment environment flag.
    #[arg(long, env = "ENVIRONMENT", value_enum, default_value = "development")]
    pub environment: Environment,
}

impl ServiceConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`Config`] error when a secret is empty, both secrets are
    /// identical, the algorithm is not an HMAC variant, or a TTL is not
    /// positive.
    ///
    /// [`Config`]: crate::ErrorKind::Config
    pub fn validate(&self) -> Result<()> {
        if self.access_token_secret.is_empty() || self.refresh_token_secret.is_empty() {
            return Err(Error::config("token secrets cannot be empty"));
        }

        if self.access_token_secret == self.refresh_token_secret {
            return Err(Error::config(
                "access and refresh token secrets must differ",
            ));
        }

        if self.access_token_expire_minutes <= 0 || self.refresh_token_expire_minutes <= 0 {
            return Err(Error::config("token lifetimes must be positive"));
        }

        if self.refresh_token_cookie_name.is_empty() {
            return Err(Error::config("refresh token cookie name cannot be empty"));
        }

        self.parse_algorithm().map(|_| ())
    }

    /// Parses the configured signing algorithm.
    ///
    /// Only the HMAC family is supported: the secrets are symmetric keys.
    pub fn parse_algorithm(&self) -> Result<Algorithm> {
        match self.token_algorithm.as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            other => Err(Error::config(format!(
                "unsupported token algorithm '{other}', expected HS256, HS384 or HS512"
            ))),
        }
    }

    /// Builds the refresh cookie policy from this configuration.
    pub fn cookie_config(&self) -> CookieConfig {
        let is_production = self.environment.is_production();
        CookieConfig {
            name: self.refresh_token_cookie_name.clone(),
            max_age: time::Duration::minutes(self.refresh_token_expire_minutes),
            secure: is_production,
            same_site: if is_production {
                SameSite::Strict
            } else {
                SameSite::Lax
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            access_token_secret: defaults::ACCESS_TOKEN_SECRET.to_string(),
            refresh_token_secret: defaults::REFRESH_TOKEN_SECRET.to_string(),
            token_algorithm: defaults::TOKEN_ALGORITHM.to_string(),
            access_token_expire_minutes: defaults::ACCESS_TOKEN_EXPIRE_MINUTES,
            refresh_token_expire_minutes: defaults::REFRESH_TOKEN_EXPIRE_MINUTES,
            refresh_token_cookie_name: defaults::REFRESH_TOKEN_COOKIE_NAME.to_string(),
            environment: Environment::Development,
        }
    }
}

/// Refresh cookie policy.
///
/// The refresh token is delivered exclusively through this cookie: http-only
/// so client-side script can never read it, `Secure`/`SameSite=Strict` in
/// production, `SameSite=Lax` otherwise.
#[derive(Debug, Clone)]
#[must_use = "cookie config does nothing unless you use it"]
pub struct CookieConfig {
    name: String,
    max_age: time::Duration,
    secure: bool,
    same_site: SameSite,
}

impl CookieConfig {
    /// Returns the cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the Set-Cookie value carrying a refresh token.
    pub fn issue(&self, refresh_token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), refresh_token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(self.max_age)
            .build()
    }

    /// Builds a removal cookie that clears the refresh token.
    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(time::Duration::ZERO)
            .build()
    }
}

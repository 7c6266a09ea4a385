//! Application services and dependency injection.

mod auth;
mod config;
mod security;
mod state;
mod telemetry;

pub use crate::service::auth::{AuthError, AuthService, TokenPair};
pub use crate::service::config::{CookieConfig, Environment, ServiceConfig};
pub use crate::service::security::{PasswordHasher, TokenClaims, TokenCodec, TokenError, TokenKind};
pub use crate::service::state::ServiceState;
pub use crate::service::telemetry::initialize_tracing;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

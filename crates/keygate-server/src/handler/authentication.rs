//! Authentication handlers: register, login, logout and refresh.
//!
//! Login and refresh split the token pair across two channels: the access
//! token travels in the JSON body for bearer-header use, the refresh token
//! only ever in the http-only cookie. Logout clears the cookie; the tokens
//! themselves are stateless and simply age out.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Form, Json, Router};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handler::{ErrorKind, Result};
use crate::service::{AuthService, CookieConfig, ServiceState};

/// Tracing target for authentication operations.
const TRACING_TARGET: &str = "keygate_server::handler::authentication";

/// Request payload for registration.
#[must_use]
#[derive(Debug, Serialize, Deserialize, Validate)]
struct RegisterRequest {
    /// Email address of the new account.
    #[validate(email)]
    pub email: String,
    /// Given name.
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    /// Family name.
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Plaintext password.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Form payload for login (OAuth2 password-grant shape).
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
struct LoginRequest {
    /// The account email.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Response returned by login and refresh.
///
/// Carries only the access token; the refresh token is set as a cookie.
#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    /// Short-lived access token for bearer-header use.
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

/// Creates a new account.
async fn register(
    State(auth_service): State<AuthService>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode> {
    tracing::trace!(
        target: TRACING_TARGET,
        email = %request.email,
        "registration attempt"
    );

    request
        .validate()
        .map_err(|e| ErrorKind::BadRequest.with_context(e.to_string()))?;

    auth_service
        .register(
            &request.email,
            &request.first_name,
            &request.last_name,
            &request.password,
        )
        .await?;

    Ok(StatusCode::CREATED)
}

/// Verifies credentials and issues the initial token pair.
async fn login(
    State(auth_service): State<AuthService>,
    State(cookie_config): State<CookieConfig>,
    jar: CookieJar,
    Form(request): Form<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    tracing::trace!(
        target: TRACING_TARGET,
        username = %request.username,
        "login attempt"
    );

    let pair = auth_service
        .login(&request.username, &request.password)
        .await?;

    let jar = jar.add(cookie_config.issue(pair.refresh_token));
    let response = TokenResponse {
        access_token: pair.access_token,
        token_type: pair.token_type.to_string(),
    };

    Ok((jar, Json(response)))
}

/// Clears the refresh cookie.
async fn logout(
    State(cookie_config): State<CookieConfig>,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.add(cookie_config.clear()))
}

/// Exchanges the refresh cookie for a new token pair.
///
/// The rotated refresh token replaces the cookie value; the presented one
/// is superseded.
async fn refresh(
    State(auth_service): State<AuthService>,
    State(cookie_config): State<CookieConfig>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let refresh_token = jar
        .get(cookie_config.name())
        .map(|cookie| cookie.value().to_owned());

    let pair = auth_service.refresh(refresh_token.as_deref()).await?;

    let jar = jar.add(cookie_config.issue(pair.refresh_token));
    let response = TokenResponse {
        access_token: pair.access_token,
        token_type: pair.token_type.to_string(),
    };

    Ok((jar, Json(response)))
}

/// Returns a [`Router`] with all related routes.
pub(crate) fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/refresh-token", post(refresh))
}

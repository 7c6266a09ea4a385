//! Bearer-token extractor for access-protected routes.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::handler::{Error, ErrorKind};
use crate::service::{AuthService, ServiceState};

/// Tracing target for authentication extraction.
const TRACING_TARGET: &str = "keygate_server::extract::current_user";

/// The authenticated subject of a request.
///
/// Extracted from the `Authorization: Bearer` header by verifying the access
/// token; a refresh token presented here is rejected like any other invalid
/// credential.
#[derive(Debug, Clone)]
#[must_use]
pub struct CurrentUser {
    /// Account id from the verified claims.
    pub account_id: i64,
    /// Email from the verified claims.
    pub email: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    ServiceState: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(bearer) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        "missing or malformed Authorization header"
                    );

                    ErrorKind::Unauthorized
                        .with_message("Could not validate user")
                        .with_context("Missing or malformed Authorization header")
                })?;

        let state = ServiceState::from_ref(state);
        let auth_service = AuthService::from_ref(&state);
        let claims = auth_service.verify_access_token(bearer.token())?;

        let account_id = claims.subject_id().ok_or_else(|| {
            tracing::warn!(
                target: TRACING_TARGET,
                "access token carries a non-numeric subject id"
            );
            ErrorKind::Unauthorized.with_message("Could not validate user")
        })?;

        Ok(Self {
            account_id,
            email: claims.subject_email,
        })
    }
}

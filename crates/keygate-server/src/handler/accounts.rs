//! Account handlers: profile lookup and password change.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use jiff::Timestamp;
use keygate_store::DynCredentialStore;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extract::CurrentUser;
use crate::handler::{ErrorKind, Result};
use crate::service::{AuthService, ServiceState};

/// Tracing target for account operations.
const TRACING_TARGET: &str = "keygate_server::handler::accounts";

/// Public view of an account, as returned by the profile endpoint.
///
/// Never exposes the password hash.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileResponse {
    /// Unique account id.
    pub id: i64,
    /// Email address (lowercase).
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

/// Request payload for a password change.
#[must_use]
#[derive(Debug, Serialize, Deserialize, Validate)]
struct PasswordChangeRequest {
    /// Current plaintext password, re-verified before any change.
    pub current_password: String,
    /// Replacement plaintext password.
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
    /// Must match `new_password` exactly.
    pub new_password_confirm: String,
}

/// Returns the profile of the authenticated account.
async fn current_account(
    State(store): State<DynCredentialStore>,
    user: CurrentUser,
) -> Result<Json<ProfileResponse>> {
    let account = store
        .find_by_id(user.account_id)
        .await
        .map_err(|error| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %error,
                "store lookup failed"
            );
            ErrorKind::InternalServerError.into_error()
        })?
        .ok_or_else(|| ErrorKind::NotFound.with_message("User not found"))?;

    Ok(Json(ProfileResponse {
        id: account.id,
        email: account.email,
        first_name: account.first_name,
        last_name: account.last_name,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }))
}

/// Replaces the password of the authenticated account.
async fn change_password(
    State(auth_service): State<AuthService>,
    user: CurrentUser,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<StatusCode> {
    tracing::trace!(
        target: TRACING_TARGET,
        account_id = user.account_id,
        "password change attempt"
    );

    request
        .validate()
        .map_err(|e| ErrorKind::BadRequest.with_context(e.to_string()))?;

    auth_service
        .change_password(
            user.account_id,
            &request.current_password,
            &request.new_password,
            &request.new_password_confirm,
        )
        .await?;

    Ok(StatusCode::OK)
}

/// Returns a [`Router`] with all related routes.
pub(crate) fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/v1/users/me", get(current_account))
        .route("/api/v1/users/change-password", put(change_password))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::handler::ErrorResponse;
    use crate::handler::test::create_test_server;

    /// Registers an account and returns an access token for it.
    async fn register_and_login(
        server: &axum_test::TestServer,
        email: &str,
        password: &str,
    ) -> anyhow::Result<String> {
        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": email,
                "first_name": "Jane",
                "last_name": "Doe",
                "password": password
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/v1/auth/login")
            .form(&[("username", email), ("password", password)])
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let access_token = body["access_token"]
            .as_str()
            .expect("login response carries an access token")
            .to_owned();

        Ok(access_token)
    }

    #[tokio::test]
    async fn profile_requires_bearer_token() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/api/v1/users/me").await;
        response.assert_status_unauthorized();

        Ok(())
    }

    #[tokio::test]
    async fn profile_rejects_garbage_token() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server
            .get("/api/v1/users/me")
            .authorization_bearer("not-a-jwt")
            .await;
        response.assert_status_unauthorized();

        let body: ErrorResponse = response.json();
        assert_eq!(body.message, "Could not validate user");

        Ok(())
    }

    #[tokio::test]
    async fn profile_returns_account_fields() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let token = register_and_login(&server, "profile@example.com", "SecurePassword123").await?;

        let response = server
            .get("/api/v1/users/me")
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();

        let body: ProfileResponse = response.json();
        assert_eq!(body.email, "profile@example.com");
        assert_eq!(body.first_name, "Jane");
        assert_eq!(body.last_name, "Doe");
        assert!(body.id > 0);

        Ok(())
    }

    #[tokio::test]
    async fn change_password_success_allows_new_login() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let token = register_and_login(&server, "rotate@example.com", "OldPassword123").await?;

        let response = server
            .put("/api/v1/users/change-password")
            .authorization_bearer(&token)
            .json(&json!({
                "current_password": "OldPassword123",
                "new_password": "NewPassword456",
                "new_password_confirm": "NewPassword456"
            }))
            .await;
        response.assert_status_ok();

        let response = server
            .post("/api/v1/auth/login")
            .form(&[
                ("username", "rotate@example.com"),
                ("password", "OldPassword123"),
            ])
            .await;
        response.assert_status_unauthorized();

        let response = server
            .post("/api/v1/auth/login")
            .form(&[
                ("username", "rotate@example.com"),
                ("password", "NewPassword456"),
            ])
            .await;
        response.assert_status_ok();

        Ok(())
    }

    #[tokio::test]
    async fn change_password_wrong_current() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let token = register_and_login(&server, "wrong@example.com", "OldPassword123").await?;

        let response = server
            .put("/api/v1/users/change-password")
            .authorization_bearer(&token)
            .json(&json!({
                "current_password": "NotMyPassword999",
                "new_password": "NewPassword456",
                "new_password_confirm": "NewPassword456"
            }))
            .await;
        response.assert_status_unauthorized();

        let body: ErrorResponse = response.json();
        assert_eq!(body.message, "Invalid current password");

        Ok(())
    }

    #[tokio::test]
    async fn change_password_confirmation_mismatch() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let token = register_and_login(&server, "mismatch@example.com", "OldPassword123").await?;

        let response = server
            .put("/api/v1/users/change-password")
            .authorization_bearer(&token)
            .json(&json!({
                "current_password": "OldPassword123",
                "new_password": "NewPassword456",
                "new_password_confirm": "SomethingElse789"
            }))
            .await;
        response.assert_status_bad_request();

        let body: ErrorResponse = response.json();
        assert_eq!(body.message, "New password and confirmation do not match");

        Ok(())
    }

    #[tokio::test]
    async fn change_password_requires_bearer_token() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server
            .put("/api/v1/users/change-password")
            .json(&json!({
                "current_password": "OldPassword123",
                "new_password": "NewPassword456",
                "new_password_confirm": "NewPassword456"
            }))
            .await;
        response.assert_status_unauthorized();

        Ok(())
    }
}

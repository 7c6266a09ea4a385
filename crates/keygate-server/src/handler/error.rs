//! HTTP error handling with builder pattern for dynamic error responses.
//!
//! All auth core failures are converted into this type at the handler
//! boundary; no store or crypto error type ever reaches a response.

use std::borrow::Cow;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::service::AuthError;

/// Tracing target for handler error conversions.
const TRACING_TARGET: &str = "keygate_server::handler::error";

/// A specialized [`Result`] type for HTTP operations.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Enumeration of the HTTP error kinds this server emits.
///
/// Each variant corresponds to a specific HTTP status code.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400 Bad Request - Invalid request data
    BadRequest,
    /// 401 Unauthorized - Invalid credentials
    Unauthorized,
    /// 404 Not Found - Resource not found
    NotFound,
    /// 500 Internal Server Error - Unexpected server error
    #[default]
    InternalServerError,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InternalServerError => "internal_server_error",
        }
    }

    /// Returns the default user-facing message.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The request could not be processed due to invalid data",
            Self::Unauthorized => "Authentication failed",
            Self::NotFound => "The requested resource was not found",
            Self::InternalServerError => {
                "An internal server error occurred. Please try again later"
            }
        }
    }

    /// Converts this error kind into a full [`Error`].
    #[inline]
    pub fn into_error(self) -> Error {
        Error::new(self)
    }

    /// Creates an [`Error`] with a custom user-facing message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_message(message)
    }

    /// Creates an [`Error`] with the specified context.
    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_context(context)
    }
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        self.into_error().into_response()
    }
}

/// The error type for HTTP handlers in the server.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    context: Option<Cow<'static, str>>,
}

impl Error {
    /// Creates a new [`Error`] with the specified kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
        }
    }

    /// Sets a custom user-friendly message for the error.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Attaches context information to the error.
    ///
    /// Context provides additional detail about what went wrong and is
    /// included in the error response.
    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'static, str>>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    /// Returns the error kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the user-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind.name(),
            self.kind.status(),
            self.message()
        )?;

        if let Some(ref context) = self.context {
            write!(f, " - {context}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<AuthError> for Error {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Registration => {
                ErrorKind::BadRequest.with_message("Unable to create user")
            }
            AuthError::Authentication(message) => ErrorKind::Unauthorized.with_message(message),
            AuthError::UserNotFound => ErrorKind::NotFound.with_message("User not found"),
            AuthError::InvalidPassword => {
                ErrorKind::Unauthorized.with_message("Invalid current password")
            }
            AuthError::PasswordMismatch => ErrorKind::BadRequest
                .with_message("New password and confirmation do not match"),
            AuthError::Internal(detail) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    detail = %detail,
                    "internal auth failure surfaced to handler"
                );
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            name: self.kind.name().to_string(),
            message: self.message().to_string(),
            context: self.context.map(Cow::into_owned),
        };

        (self.kind.status(), Json(response)).into_response()
    }
}

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error name.
    pub name: String,
    /// User-facing message.
    pub message: String,
    /// Optional additional detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

//! API error taxonomy and its HTTP rendering.
//!
//! Every failure leaves the server as a status code plus a JSON
//! [`ErrorBody`]. Internal failures answer with a generic message and the
//! underlying detail.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskboard_proto::error::ErrorBody;

use crate::store::StoreError;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required field is missing or a value is malformed.
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed, expired or tampered bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// No task matches the id for this user.
    #[error("task not found or unauthorized")]
    NotFound,

    /// The username is already registered.
    #[error("username already exists")]
    Conflict,

    /// Unknown username or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Store or server failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => Self::Conflict,
            full @ StoreError::ColumnFull(_) => Self::Validation(full.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                ErrorBody::new("internal server error").with_details(detail.clone())
            }
            other => {
                tracing::debug!(status = %status, error = %other, "request rejected");
                ErrorBody::new(other.to_string())
            }
        };
        (status, Json(body)).into_response()
    }
}

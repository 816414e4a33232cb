//! Error taxonomy and its mapping onto HTTP responses.
//!
//! Response bodies only ever carry a generic code. The precise reason for an
//! authentication failure or a visibility denial is logged, never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// Why a credential could not be turned into a principal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credential presented")]
    Missing,
    #[error("credential is not a well-formed token")]
    Malformed,
    #[error("token signature does not verify")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token subject does not match any account")]
    UnknownSubject,
    #[error("username or password is wrong")]
    InvalidCredentials,
}

/// Boot-time rejection of the signing secret. The process must not start.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SecretKeyError {
    #[error("signing secret is missing")]
    Missing,
    #[error("signing secret is not valid base64")]
    NotBase64,
    #[error("signing secret decodes to {bits} bits; at least 256 are required")]
    TooShort { bits: usize },
}

/// ApiError
///
/// The single error type handlers return. Each variant maps to exactly one
/// status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// JSON shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Repository(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (code, message) = match self {
            ApiError::Unauthorized(_) => ("unauthorized", None),
            ApiError::Forbidden => ("forbidden", None),
            ApiError::NotFound => ("not_found", None),
            ApiError::RateLimited => ("too_many_requests", None),
            // Validation and conflict messages describe the caller's own input.
            ApiError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            ApiError::Conflict(msg) | ApiError::Repository(RepositoryError::Conflict(msg)) => {
                ("conflict", Some(msg.clone()))
            }
            ApiError::Repository(_) | ApiError::Internal(_) => ("internal_error", None),
        };
        ErrorBody {
            error: code.to_string(),
            message,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, "Rejecting request without valid credential");
            }
            ApiError::Repository(RepositoryError::Conflict(_)) => {}
            ApiError::Repository(e) => tracing::error!("Repository failure: {:?}", e),
            ApiError::Internal(e) => tracing::error!("Internal failure: {}", e),
            _ => {}
        }
        (status, Json(self.body())).into_response()
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures while issuing or validating a session token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token has expired")]
    ExpiredToken,
    #[error("failed to sign token")]
    Signing,
}

/// Why a supplied verification key was refused. Never shown to callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no verification key issued for owner")]
    MissingVerificationKey,
    #[error("verification key does not match")]
    TokenMismatch,
}

/// Why a card could not be stored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardConflict {
    #[error("owner already has a card")]
    OwnerHasCard,
    #[error("reference id already in use")]
    ReferenceTaken,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Signing => {
                tracing::error!(error = %err, "Session signing failed");
                Self::Internal
            }
            _ => {
                tracing::debug!(reason = %err, "Session rejected");
                Self::Unauthorized
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            Self::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Conflict(msg) => {
                tracing::debug!(message = %msg, "Conflict");
                (StatusCode::CONFLICT, msg)
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(json!({ "data": message }))).into_response()
    }
}

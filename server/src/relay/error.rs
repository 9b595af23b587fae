//! Relay Error Types
//!
//! HTTP-facing errors for the server-to-broker API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::workspaces::RegistryError;

/// Errors returned by `/api/register` and `/api/send`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed request field.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Signature did not verify against the stored server key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Registration code did not match.
    #[error("Invalid registration code")]
    InvalidAuthCode,

    /// Registration code was already used.
    #[error("Registration code already consumed")]
    AuthCodeConsumed,

    /// Timestamp outside the replay window.
    #[error("Request timestamp outside the allowed window")]
    StaleTimestamp,

    #[error("Workspace not found")]
    WorkspaceNotFound,

    #[error("Workspace is not active")]
    WorkspaceInactive,

    #[error("Workspace is already active")]
    AlreadyActive,

    /// Body could not be decrypted. Deliberately generic.
    #[error("Could not decrypt request body")]
    DecryptionFailed,

    /// Slack API call failed.
    #[error("Platform API error: {0}")]
    Platform(String),

    #[error("Internal server error")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl RelayError {
    /// Status code and machine-readable code.
    pub const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::InvalidSignature => (StatusCode::FORBIDDEN, "INVALID_SIGNATURE"),
            Self::InvalidAuthCode => (StatusCode::FORBIDDEN, "INVALID_AUTH_CODE"),
            Self::AuthCodeConsumed => (StatusCode::FORBIDDEN, "AUTH_CODE_CONSUMED"),
            Self::StaleTimestamp => (StatusCode::FORBIDDEN, "STALE_TIMESTAMP"),
            Self::WorkspaceNotFound => (StatusCode::NOT_FOUND, "WORKSPACE_NOT_FOUND"),
            Self::WorkspaceInactive => (StatusCode::NOT_FOUND, "WORKSPACE_INACTIVE"),
            Self::AlreadyActive => (StatusCode::CONFLICT, "ALREADY_ACTIVE"),
            Self::DecryptionFailed => (StatusCode::BAD_REQUEST, "DECRYPTION_FAILED"),
            Self::Platform(_) => (StatusCode::BAD_GATEWAY, "PLATFORM_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if let Self::Internal(detail) = &self {
            error!(detail = %detail, "Relay request failed");
        }

        let body = Json(ErrorResponse {
            ok: false,
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<RegistryError> for RelayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::WorkspaceNotFound,
            RegistryError::AlreadyActive => Self::AlreadyActive,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for relay handlers.
pub type RelayResult<T> = Result<T, RelayError>;

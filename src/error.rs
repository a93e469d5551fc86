//! Unified API error handling
//!
//! Domain services return their own error enums; the HTTP edge converts them
//! into `ApiError`, which produces consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{RequestStatus, VerificationStatus};
use crate::store::StoreError;

// ============================================================================
// Domain errors
// ============================================================================

/// Failures of the service request lifecycle
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("request submission failed")]
    RequestSubmissionFailed(#[source] StoreError),

    #[error("request fetch failed")]
    RequestFetchFailed(#[source] StoreError),

    #[error("request update failed")]
    RequestUpdateFailed(#[source] StoreError),

    #[error("cannot move a {from} request to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("service request {0} not found")]
    NotFound(Uuid),
}

/// Failures of the technician verification workflow
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("technician {0} not found")]
    NotFound(Uuid),

    #[error("technician is already {0}")]
    AlreadyInStatus(VerificationStatus),

    #[error("technician store failure")]
    Store(#[from] StoreError),
}

// ============================================================================
// HTTP errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            // Don't leak internal error details
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::AuthenticationRequired => {
                Self::Unauthorized("Please sign in to continue".to_string())
            }
            RequestError::ValidationFailure(msg) => Self::BadRequest(msg),
            RequestError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            RequestError::Forbidden(msg) => Self::Forbidden(msg),
            RequestError::NotFound(_) => Self::NotFound(err.to_string()),
            RequestError::RequestSubmissionFailed(_)
            | RequestError::RequestFetchFailed(_)
            | RequestError::RequestUpdateFailed(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::NotFound(_) => Self::NotFound(err.to_string()),
            VerificationError::AlreadyInStatus(_) => Self::Conflict(err.to_string()),
            VerificationError::Store(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log internal errors
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            request_id: None, // Will be populated by middleware if available
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

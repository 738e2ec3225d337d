//! Centralized error responder.
//!
//! Every handler and the token middleware fail with [`ApiError`]; its
//! `IntoResponse` impl is the only place error responses are shaped.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use driverelay_common::Error as ProviderError;

/// HTTP-facing errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, invalid or expired bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// The request itself was malformed.
    #[error("{0}")]
    BadRequest(String),

    /// An extractor refused the request; keeps the status axum chose.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The authorization code could not be exchanged.
    #[error("Error during authentication")]
    AuthenticationFailed,

    /// The provider's file API failed.
    #[error("{0}")]
    Upstream(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Map a provider failure to a 500, preferring the provider's own message
    /// and falling back to `fallback`.
    pub fn upstream(err: ProviderError, fallback: &str) -> Self {
        error!(error = %err, "{}", fallback);
        let message = err
            .provider_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());
        ApiError::Upstream(message)
    }

    /// Map an unexpected local failure to a 500.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        error!(error = %err, "Internal error");
        ApiError::Internal("Internal Server Error".to_string())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::AuthenticationFailed => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // The login callback answers in plain text.
            ApiError::AuthenticationFailed => (status, self.to_string()).into_response(),
            _ => (
                status,
                Json(ErrorBody {
                    error: self.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

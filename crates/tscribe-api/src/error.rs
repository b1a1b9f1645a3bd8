//! API error types.
//!
//! Every failure leaves the service as `{success: false, error: {code,
//! message, details?}, timestamp}` with a stable machine-readable code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use tscribe_models::{TransitionError, UrlError};
use tscribe_store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request validation failure (bad URL, enum value, id format or body).
    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("{0}")]
    VideoNotFound(String),

    #[error("{0}")]
    WebhookInvalid(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(#[source] StoreError),
}

impl ApiError {
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::VideoNotFound(msg.into())
    }

    pub fn webhook_invalid(msg: impl Into<String>) -> Self {
        Self::WebhookInvalid(msg.into())
    }

    /// Stable error code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::InvalidStatus(_) => "INVALID_STATUS",
            ApiError::VideoNotFound(_) => "VIDEO_NOT_FOUND",
            ApiError::WebhookInvalid(_) => "WEBHOOK_INVALID",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl(_) | ApiError::InvalidPayload(_) | ApiError::InvalidStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::VideoNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WebhookInvalid(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Database(_))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::not_found("Job not found"),
            StoreError::Transition(t) => t.into(),
            StoreError::Conflict(id) => {
                ApiError::InvalidPayload(format!("Job {} was modified concurrently", id))
            }
            other => ApiError::Database(other),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::InvalidPayload(msg) => ApiError::InvalidPayload(msg),
            TransitionError::InvalidStatus(msg) => ApiError::InvalidStatus(msg),
        }
    }
}

impl From<UrlError> for ApiError {
    fn from(e: UrlError) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
    timestamp: i64,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Attached to responses built from internal errors so their detail can be
/// withheld in production (see `middleware::hide_internal_errors`).
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorMarker {
    pub code: &'static str,
}

pub(crate) const REDACTED_MESSAGE: &str = "An internal error occurred";

pub(crate) fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: ErrorBody {
            code,
            message,
            details: None,
        },
        timestamp: chrono::Utc::now().timestamp(),
    };

    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_internal() {
            error!(error = %self, "Request failed with internal error");
            let mut response = error_response(status, code, self.to_string());
            response.extensions_mut().insert(InternalErrorMarker { code });
            return response;
        }

        error_response(status, code, self.to_string())
    }
}

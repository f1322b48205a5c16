//! # HTTP error mapping
//!
//! Every failure leaves the API as `{error, message, details?}`. Messages
//! for authentication and lookup failures are fixed strings so responses
//! never reveal whether a resource exists or why a token was refused.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{DomainError, RepoError, ValidationErrors};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Body could not be decoded at all (bad JSON, wrong content type).
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Domain(DomainError::Validation(errors))
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        Self::Domain(DomainError::Repository(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    /// Multipart stream errors; a tripped body limit surfaces here too.
    pub fn from_multipart(e: MultipartError, limit: usize) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::Domain(DomainError::PayloadTooLarge { limit })
        } else {
            Self::MalformedBody(e.body_text())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Domain(e) => match e {
                DomainError::Validation(_)
                | DomainError::Captcha
                | DomainError::InvalidCredentials
                | DomainError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
                DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                DomainError::Repository(_) | DomainError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, message, details) = match self {
            Self::MalformedBody(reason) => (
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(ValidationErrors::single("body", reason.clone())),
            ),
            Self::Domain(e) => match e {
                DomainError::Validation(errors) => (
                    "VALIDATION_ERROR",
                    "Validation failed".to_string(),
                    Some(errors.clone()),
                ),
                DomainError::Captcha => {
                    ("CAPTCHA_ERROR", "Captcha verification failed".to_string(), None)
                }
                DomainError::InvalidCredentials => {
                    ("INVALID_CREDENTIALS", "Invalid credentials".to_string(), None)
                }
                DomainError::Unauthenticated => {
                    ("UNAUTHENTICATED", UNAUTHENTICATED_MESSAGE.to_string(), None)
                }
                DomainError::NotFound(_) => ("NOT_FOUND", NOT_FOUND_MESSAGE.to_string(), None),
                DomainError::PayloadTooLarge { limit } => (
                    "PAYLOAD_TOO_LARGE",
                    format!("Image exceeds the {limit} byte limit"),
                    None,
                ),
                DomainError::UnsupportedMediaType(mime) => (
                    "UNSUPPORTED_MEDIA_TYPE",
                    format!(
                        "Unsupported image type {mime}; \
                         expected image/jpeg, image/png or image/webp"
                    ),
                    None,
                ),
                DomainError::Repository(_) | DomainError::Internal(_) => {
                    ("INTERNAL_ERROR", INTERNAL_MESSAGE.to_string(), None)
                }
            },
        };
        ErrorBody {
            error,
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

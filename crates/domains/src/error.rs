//! # Errors
//!
//! Failure taxonomy shared by every layer. The HTTP adapter maps each variant
//! to a status code; nothing below that layer knows about HTTP.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures collected before a request is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a failure carrying exactly one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.first() {
            Some(first) => write!(f, "{}: {}", first.field, first.message),
            None => f.write_str("invalid input"),
        }
    }
}

/// Failures raised by persistence and media adapters.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A uniqueness constraint was violated (e.g. duplicate username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (database down, disk full, ...).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// The primary error type for all domain and service operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input, with field-level detail.
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// The captcha provider rejected the token or its origin.
    #[error("captcha verification failed")]
    Captcha,

    /// Unknown account or wrong password; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, forged or expired session token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Missing resource, or one the caller is not allowed to see.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Repository(#[from] RepoError),

    /// Unexpected failure; detail is logged, never shown to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A specialized Result type for Folio domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;

//! Application-wide error classification.
//!
//! Domain errors convert into `AppError` so the boundary layer can pick a
//! status without inspecting domain internals.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request input was rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to touch the resource.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// An upstream dependency (object store) failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classification shared with the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something unusable.
    BadInput,
    /// The addressed resource does not exist.
    NotFound,
    /// The caller lacks permission.
    Forbidden,
    /// A remote dependency failed.
    UpstreamFailure,
    /// Anything else.
    Internal,
}

impl AppError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::BadInput,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Forbidden(_) => ErrorClass::Forbidden,
            Self::ExternalService(_) => ErrorClass::UpstreamFailure,
            Self::Database(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::BadInput => 400,
            ErrorClass::Forbidden => 403,
            ErrorClass::NotFound => 404,
            ErrorClass::UpstreamFailure => 502,
            ErrorClass::Internal => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

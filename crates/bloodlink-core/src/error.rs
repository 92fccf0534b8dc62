//! Unified application error types for BloodLink.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The kind carries enough structure
//! for the HTTP layer to pick a status code without string matching.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The fixed message returned for every phone verification failure.
///
/// Never varies between "wrong code", "expired" and "not found".
pub const INVALID_OR_EXPIRED_CODE: &str = "Invalid or expired verification code";

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Malformed input (phone format, missing blood type, ...).
    Validation,
    /// Issuance or attempt throttled; always carries a retry-after hint.
    RateLimited,
    /// Phone verification failed. Deliberately non-specific.
    InvalidOrExpiredCode,
    /// The requested request, donation, notification or user does not exist.
    NotFound,
    /// An SMS or realtime provider failed after local recovery was exhausted.
    ExternalService,
    /// The operation conflicts with the current state of the record.
    Conflict,
    /// Missing or invalid session credential.
    Authentication,
    /// The caller is not a party to the record it tried to mutate.
    Authorization,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::RateLimited => write!(f, "RATE_LIMITED"),
            Self::InvalidOrExpiredCode => write!(f, "INVALID_OR_EXPIRED_CODE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout BloodLink.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Retry hint, set for `RateLimited`.
    pub retry_after: Option<Duration>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a rate-limited error carrying the retry-after hint.
    pub fn rate_limited(retry_after: Duration) -> Self {
        let secs = retry_after.as_millis().div_ceil(1000).max(1) as u64;
        Self {
            kind: ErrorKind::RateLimited,
            message: format!("Too many attempts, retry after {secs} seconds"),
            retry_after: Some(Duration::from_secs(secs)),
            source: None,
        }
    }

    /// Create the generic verification failure.
    pub fn invalid_or_expired_code() -> Self {
        Self::new(ErrorKind::InvalidOrExpiredCode, INVALID_OR_EXPIRED_CODE)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an external service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            retry_after: self.retry_after,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

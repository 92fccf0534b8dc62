//! Channel delivery errors.

use bloodlink_core::error::AppError;
use bloodlink_core::traits::SmsError;

/// Error from a single channel send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Timeout, 5xx or throttling. Worth another attempt.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The provider rejected the message. Retrying will not help.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The error text without the classification prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(r) | Self::Permanent(r) => r,
        }
    }
}

impl From<SmsError> for DeliveryError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Transient(msg) => Self::Transient(msg),
            SmsError::Permanent(msg) => Self::Permanent(msg),
        }
    }
}

impl From<AppError> for DeliveryError {
    fn from(err: AppError) -> Self {
        // Realtime emit failures are connection problems, never rejections.
        Self::Transient(err.message)
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::external_service(err.to_string())
    }
}

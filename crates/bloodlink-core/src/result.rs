//! Convenience result type alias for BloodLink.

use crate::error::AppError;

/// A specialized `Result` type for BloodLink operations.
pub type AppResult<T> = Result<T, AppError>;

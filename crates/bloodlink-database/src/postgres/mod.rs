//! PostgreSQL repositories.
//!
//! Enumerations are stored as their text tokens and parsed back on read;
//! the row structs in [`rows`] carry the raw column types.

pub mod codes;
pub mod donations;
pub mod donors;
pub mod notifications;
pub mod requests;
mod rows;

pub use codes::PgCodeRepository;
pub use donations::PgDonationRepository;
pub use donors::PgDonorDirectory;
pub use notifications::PgNotificationRepository;
pub use requests::PgRequestRepository;

use bloodlink_core::error::{AppError, ErrorKind};

/// Map a sqlx failure to a database error with context.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

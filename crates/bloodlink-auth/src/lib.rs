//! # bloodlink-auth
//!
//! Phone-based authentication for BloodLink.
//!
//! ## Modules
//!
//! - `phone` — E.164 normalization and the phone → user id mapping
//! - `rate_limit` — sliding-window limiter per (key, scope)
//! - `verification` — time-boxed, single-use verification codes
//! - `jwt` — session tokens minted for a verified phone

pub mod jwt;
pub mod phone;
pub mod rate_limit;
pub mod verification;

pub use jwt::{SessionClaims, SessionIssuer, SessionToken};
pub use phone::{normalize_phone, user_id_for_phone};
pub use rate_limit::{RateDecision, RateLimiter, RateScope};
pub use verification::{IssueReceipt, PhoneClaim, VerificationCodeStore};

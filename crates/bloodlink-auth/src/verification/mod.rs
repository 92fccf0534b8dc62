//! Phone verification codes.

pub mod code;
pub mod store;

pub use store::{IssueReceipt, PhoneClaim, VerificationCodeStore};

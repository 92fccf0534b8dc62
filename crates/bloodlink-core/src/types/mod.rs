//! Shared value types used across BloodLink crates.

pub mod id;

pub use id::{DonationId, NotificationId, RequestId, UserId};

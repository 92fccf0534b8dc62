//! Phone verification code record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single live code for a phone number.
///
/// Only a digest of the code is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    /// E.164 phone number. Unique key.
    pub phone_number: String,
    /// Hex SHA-256 digest of the issued code.
    pub code_hash: String,
    /// After this instant the code is invalid and may be purged.
    pub expires_at: DateTime<Utc>,
    /// Set once the code has been consumed.
    pub verified: bool,
    /// When the code was issued.
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Whether the code may still be redeemed at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.verified && self.expires_at > now
    }

    /// Whether the record has outlived its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

//! JWT claims carried by a session token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bloodlink_core::types::UserId;

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id derived from the phone number.
    pub sub: Uuid,
    /// Verified phone number.
    pub phone: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
    /// Token id.
    pub jti: Uuid,
}

impl SessionClaims {
    /// The authenticated user.
    pub fn user_id(&self) -> UserId {
        UserId::from(self.sub)
    }

    /// Expiration as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

//! In-memory verification code storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use bloodlink_core::result::AppResult;
use bloodlink_entity::verification::VerificationCode;

use crate::repositories::VerificationCodeRepository;

/// Verification codes keyed by phone number.
#[derive(Debug, Default)]
pub struct MemoryCodeRepository {
    codes: DashMap<String, VerificationCode>,
}

impl MemoryCodeRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCodeRepository for MemoryCodeRepository {
    async fn replace(&self, code: &VerificationCode) -> AppResult<()> {
        self.codes.insert(code.phone_number.clone(), code.clone());
        Ok(())
    }

    async fn find_live(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<VerificationCode>> {
        Ok(self
            .codes
            .get(phone)
            .filter(|c| !c.is_expired(now))
            .map(|c| c.value().clone()))
    }

    async fn mark_verified(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.codes.get_mut(phone) else {
            return Ok(false);
        };
        if !entry.is_redeemable(now) || entry.code_hash != code_hash {
            return Ok(false);
        }
        entry.verified = true;
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, c| !c.verified && !c.is_expired(now));
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

//! Verification code repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bloodlink_core::result::AppResult;
use bloodlink_entity::verification::VerificationCode;

use super::db_err;
use super::rows::CodeRow;
use crate::repositories::VerificationCodeRepository;

/// Verification codes in the `verification_codes` table.
#[derive(Debug, Clone)]
pub struct PgCodeRepository {
    pool: PgPool,
}

impl PgCodeRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationCodeRepository for PgCodeRepository {
    async fn replace(&self, code: &VerificationCode) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO verification_codes (phone_number, code_hash, expires_at, verified, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (phone_number) DO UPDATE SET \
             code_hash = EXCLUDED.code_hash, expires_at = EXCLUDED.expires_at, \
             verified = EXCLUDED.verified, created_at = EXCLUDED.created_at",
        )
        .bind(&code.phone_number)
        .bind(&code.code_hash)
        .bind(code.expires_at)
        .bind(code.verified)
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to store verification code"))?;
        Ok(())
    }

    async fn find_live(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, CodeRow>(
            "SELECT * FROM verification_codes WHERE phone_number = $1 AND expires_at > $2",
        )
        .bind(phone)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load verification code"))?;
        Ok(row.map(VerificationCode::from))
    }

    async fn mark_verified(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE verification_codes SET verified = TRUE \
             WHERE phone_number = $1 AND code_hash = $2 AND verified = FALSE AND expires_at > $3",
        )
        .bind(phone)
        .bind(code_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to consume verification code"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM verification_codes WHERE expires_at <= $1 OR verified = TRUE")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to purge verification codes"))?;
        Ok(result.rows_affected())
    }
}

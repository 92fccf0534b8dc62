//! Donation repository.

use async_trait::async_trait;
use sqlx::PgPool;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::types::{DonationId, RequestId, UserId};
use bloodlink_entity::donation::Donation;

use super::db_err;
use super::rows::DonationRow;
use crate::repositories::DonationRepository;

/// Donations in the `donations` table.
#[derive(Debug, Clone)]
pub struct PgDonationRepository {
    pool: PgPool,
}

impl PgDonationRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonationRepository for PgDonationRepository {
    async fn insert_if_absent(&self, donation: &Donation) -> AppResult<(Donation, bool)> {
        let inserted = sqlx::query(
            "INSERT INTO donations (id, request_id, donor_id, recipient_id, blood_type, donation_date, \
             donor_confirmed, donor_confirmed_at, recipient_confirmed, recipient_confirmed_at, status, \
             volume_ml, dispute_reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (request_id, donor_id) DO NOTHING",
        )
        .bind(donation.id.into_uuid())
        .bind(donation.request_id.into_uuid())
        .bind(donation.donor_id.into_uuid())
        .bind(donation.recipient_id.into_uuid())
        .bind(donation.blood_type.as_str())
        .bind(donation.donation_date)
        .bind(donation.donor_confirmed)
        .bind(donation.donor_confirmed_at)
        .bind(donation.recipient_confirmed)
        .bind(donation.recipient_confirmed_at)
        .bind(donation.status.as_str())
        .bind(donation.volume_ml.map(|v| v as i32))
        .bind(&donation.dispute_reason)
        .bind(donation.created_at)
        .bind(donation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert donation"))?;

        if inserted.rows_affected() == 1 {
            return Ok((donation.clone(), true));
        }
        let existing = self
            .find_for_match(donation.request_id, donation.donor_id)
            .await?
            .ok_or_else(|| AppError::internal("Donation conflict without existing record"))?;
        Ok((existing, false))
    }

    async fn find(&self, id: DonationId) -> AppResult<Option<Donation>> {
        sqlx::query_as::<_, DonationRow>("SELECT * FROM donations WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load donation"))?
            .map(Donation::try_from)
            .transpose()
    }

    async fn find_for_match(
        &self,
        request_id: RequestId,
        donor_id: UserId,
    ) -> AppResult<Option<Donation>> {
        sqlx::query_as::<_, DonationRow>(
            "SELECT * FROM donations WHERE request_id = $1 AND donor_id = $2",
        )
        .bind(request_id.into_uuid())
        .bind(donor_id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load donation"))?
        .map(Donation::try_from)
        .transpose()
    }

    async fn count_completed(&self, request_id: RequestId) -> AppResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM donations WHERE request_id = $1 AND status = 'completed'",
        )
        .bind(request_id.into_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count completed donations"))?;
        Ok(count.max(0) as u32)
    }

    async fn compare_and_swap(&self, current: &Donation, next: &Donation) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE donations SET donation_date = $5, donor_confirmed = $6, donor_confirmed_at = $7, \
             recipient_confirmed = $8, recipient_confirmed_at = $9, status = $10, volume_ml = $11, \
             dispute_reason = $12, updated_at = $13 \
             WHERE id = $1 AND status = $2 AND donor_confirmed = $3 AND recipient_confirmed = $4",
        )
        .bind(current.id.into_uuid())
        .bind(current.status.as_str())
        .bind(current.donor_confirmed)
        .bind(current.recipient_confirmed)
        .bind(next.donation_date)
        .bind(next.donor_confirmed)
        .bind(next.donor_confirmed_at)
        .bind(next.recipient_confirmed)
        .bind(next.recipient_confirmed_at)
        .bind(next.status.as_str())
        .bind(next.volume_ml.map(|v| v as i32))
        .bind(&next.dispute_reason)
        .bind(next.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update donation"))?;
        Ok(result.rows_affected() == 1)
    }
}

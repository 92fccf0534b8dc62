//! Donor directory repository.

use async_trait::async_trait;
use sqlx::PgPool;

use bloodlink_core::result::AppResult;
use bloodlink_core::types::UserId;
use bloodlink_entity::blood::BloodType;
use bloodlink_entity::donor::DonorProfile;
use bloodlink_entity::request::BoundingBox;

use super::db_err;
use super::rows::DonorRow;
use crate::repositories::DonorDirectory;

/// Donor profiles in the `donors` table.
#[derive(Debug, Clone)]
pub struct PgDonorDirectory {
    pool: PgPool,
}

impl PgDonorDirectory {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonorDirectory for PgDonorDirectory {
    async fn upsert(&self, donor: &DonorProfile) -> AppResult<()> {
        let preferences = serde_json::to_value(&donor.preferences)?;
        sqlx::query(
            "INSERT INTO donors (user_id, name, phone_number, blood_type, lat, lng, available, \
             last_donation_at, preferences) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name, \
             phone_number = EXCLUDED.phone_number, blood_type = EXCLUDED.blood_type, \
             lat = EXCLUDED.lat, lng = EXCLUDED.lng, available = EXCLUDED.available, \
             last_donation_at = EXCLUDED.last_donation_at, preferences = EXCLUDED.preferences",
        )
        .bind(donor.user_id.into_uuid())
        .bind(&donor.name)
        .bind(&donor.phone_number)
        .bind(donor.blood_type.as_str())
        .bind(donor.location.lat)
        .bind(donor.location.lng)
        .bind(donor.available)
        .bind(donor.last_donation_at)
        .bind(preferences)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to upsert donor"))?;
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<DonorProfile>> {
        sqlx::query_as::<_, DonorRow>("SELECT * FROM donors WHERE user_id = $1")
            .bind(user_id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load donor"))?
            .map(DonorProfile::try_from)
            .transpose()
    }

    async fn find_in_area(
        &self,
        blood_types: &[BloodType],
        area: &BoundingBox,
    ) -> AppResult<Vec<DonorProfile>> {
        let types: Vec<String> = blood_types.iter().map(|t| t.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, DonorRow>(
            "SELECT * FROM donors WHERE blood_type = ANY($1) \
             AND lat BETWEEN $2 AND $3 AND lng BETWEEN $4 AND $5",
        )
        .bind(&types)
        .bind(area.min_lat)
        .bind(area.max_lat)
        .bind(area.min_lng)
        .bind(area.max_lng)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query donors"))?;

        rows.into_iter().map(DonorProfile::try_from).collect()
    }
}

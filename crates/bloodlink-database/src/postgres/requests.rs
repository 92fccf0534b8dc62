//! Blood request repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::types::RequestId;
use bloodlink_entity::request::{BloodRequest, MatchedDonor};

use super::db_err;
use super::rows::{MatchRow, RequestRow};
use crate::repositories::RequestRepository;

/// Requests in `blood_requests`, matched donors in `request_matches`.
#[derive(Debug, Clone)]
pub struct PgRequestRepository {
    pool: PgPool,
}

impl PgRequestRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_matches(&self, id: RequestId) -> AppResult<Vec<MatchRow>> {
        sqlx::query_as::<_, MatchRow>(
            "SELECT donor_id, donor_name, donor_blood_type, status, responded_at, message \
             FROM request_matches WHERE request_id = $1 ORDER BY position",
        )
        .bind(id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load matched donors"))
    }
}

#[async_trait]
impl RequestRepository for PgRequestRepository {
    async fn insert(&self, request: &BloodRequest) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let result = sqlx::query(
            "INSERT INTO blood_requests (id, requester_id, patient_name, blood_type, hospital_name, \
             hospital_lat, hospital_lng, urgency, required_units, fulfilled_units, deadline, status, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(request.id.into_uuid())
        .bind(request.requester_id.into_uuid())
        .bind(&request.patient.name)
        .bind(request.patient.blood_type.as_str())
        .bind(&request.hospital.name)
        .bind(request.hospital.coordinates.lat)
        .bind(request.hospital.coordinates.lng)
        .bind(request.urgency.as_str())
        .bind(request.required_units as i32)
        .bind(request.fulfilled_units as i32)
        .bind(request.deadline)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert request"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "Request {} already exists",
                request.id
            )));
        }

        for entry in &request.matched_donors {
            sqlx::query(
                "INSERT INTO request_matches (request_id, donor_id, donor_name, donor_blood_type, \
                 status, responded_at, message) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(request.id.into_uuid())
            .bind(entry.donor_id.into_uuid())
            .bind(&entry.donor_name)
            .bind(entry.donor_blood_type.as_str())
            .bind(entry.status.as_str())
            .bind(entry.responded_at)
            .bind(&entry.message)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert matched donor"))?;
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit request"))?;
        Ok(())
    }

    async fn find(&self, id: RequestId) -> AppResult<Option<BloodRequest>> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM blood_requests WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load request"))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let matches = self.load_matches(id).await?;
        row.into_request(matches).map(Some)
    }

    async fn upsert_match(
        &self,
        id: RequestId,
        entry: &MatchedDonor,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let touched = sqlx::query("UPDATE blood_requests SET updated_at = $2 WHERE id = $1")
            .bind(id.into_uuid())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to touch request"))?;
        if touched.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Request {id} not found")));
        }

        sqlx::query(
            "INSERT INTO request_matches (request_id, donor_id, donor_name, donor_blood_type, \
             status, responded_at, message) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (request_id, donor_id) DO UPDATE SET \
             donor_name = EXCLUDED.donor_name, donor_blood_type = EXCLUDED.donor_blood_type, \
             status = EXCLUDED.status, responded_at = EXCLUDED.responded_at, message = EXCLUDED.message",
        )
        .bind(id.into_uuid())
        .bind(entry.donor_id.into_uuid())
        .bind(&entry.donor_name)
        .bind(entry.donor_blood_type.as_str())
        .bind(entry.status.as_str())
        .bind(entry.responded_at)
        .bind(&entry.message)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to upsert matched donor"))?;
        Ok(())
    }

    async fn sync_fulfilled_units(
        &self,
        id: RequestId,
        completed: u32,
        now: DateTime<Utc>,
    ) -> AppResult<BloodRequest> {
        sqlx::query(
            "UPDATE blood_requests SET \
             fulfilled_units = GREATEST(fulfilled_units, LEAST(required_units, $2)), \
             status = CASE WHEN GREATEST(fulfilled_units, LEAST(required_units, $2)) = required_units \
                      AND status = 'active' THEN 'fulfilled' ELSE status END, \
             updated_at = CASE WHEN LEAST(required_units, $2) > fulfilled_units \
                          THEN $3 ELSE updated_at END \
             WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(completed.min(i32::MAX as u32) as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to sync fulfilled units"))?;

        self.find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))
    }
}

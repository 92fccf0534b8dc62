//! In-memory blood request storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::types::RequestId;
use bloodlink_entity::request::{BloodRequest, MatchedDonor};

use crate::repositories::RequestRepository;

/// Blood requests keyed by id.
#[derive(Debug, Default)]
pub struct MemoryRequestRepository {
    requests: DashMap<RequestId, BloodRequest>,
}

impl MemoryRequestRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestRepository for MemoryRequestRepository {
    async fn insert(&self, request: &BloodRequest) -> AppResult<()> {
        match self.requests.entry(request.id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Request {} already exists",
                request.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(request.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, id: RequestId) -> AppResult<Option<BloodRequest>> {
        Ok(self.requests.get(&id).map(|r| r.value().clone()))
    }

    async fn upsert_match(
        &self,
        id: RequestId,
        entry: &MatchedDonor,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))?;
        request.upsert_match(entry.clone());
        request.updated_at = now;
        Ok(())
    }

    async fn sync_fulfilled_units(
        &self,
        id: RequestId,
        completed: u32,
        now: DateTime<Utc>,
    ) -> AppResult<BloodRequest> {
        let mut request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))?;
        request.sync_fulfilled_units(completed, now);
        Ok(request.clone())
    }
}

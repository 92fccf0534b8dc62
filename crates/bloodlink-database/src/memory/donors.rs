//! In-memory donor directory.

use async_trait::async_trait;
use dashmap::DashMap;

use bloodlink_core::result::AppResult;
use bloodlink_core::types::UserId;
use bloodlink_entity::blood::BloodType;
use bloodlink_entity::donor::DonorProfile;
use bloodlink_entity::request::BoundingBox;

use crate::repositories::DonorDirectory;

/// Donor profiles keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryDonorDirectory {
    donors: DashMap<UserId, DonorProfile>,
}

impl MemoryDonorDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DonorDirectory for MemoryDonorDirectory {
    async fn upsert(&self, donor: &DonorProfile) -> AppResult<()> {
        self.donors.insert(donor.user_id, donor.clone());
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<DonorProfile>> {
        Ok(self.donors.get(&user_id).map(|d| d.value().clone()))
    }

    async fn find_in_area(
        &self,
        blood_types: &[BloodType],
        area: &BoundingBox,
    ) -> AppResult<Vec<DonorProfile>> {
        Ok(self
            .donors
            .iter()
            .filter(|d| blood_types.contains(&d.blood_type) && area.contains(&d.location))
            .map(|d| d.value().clone())
            .collect())
    }
}

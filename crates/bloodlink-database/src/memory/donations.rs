//! In-memory donation storage.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use bloodlink_core::result::AppResult;
use bloodlink_core::types::{DonationId, RequestId, UserId};
use bloodlink_entity::donation::{Donation, DonationStatus};

use crate::repositories::DonationRepository;

/// Donations keyed by id, with a (request, donor) index.
#[derive(Debug, Default)]
pub struct MemoryDonationRepository {
    donations: DashMap<DonationId, Donation>,
    by_match: DashMap<(RequestId, UserId), DonationId>,
}

impl MemoryDonationRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DonationRepository for MemoryDonationRepository {
    async fn insert_if_absent(&self, donation: &Donation) -> AppResult<(Donation, bool)> {
        match self.by_match.entry((donation.request_id, donation.donor_id)) {
            Entry::Occupied(existing) => {
                let stored = self
                    .donations
                    .get(existing.get())
                    .map(|d| d.value().clone())
                    .unwrap_or_else(|| donation.clone());
                Ok((stored, false))
            }
            Entry::Vacant(slot) => {
                self.donations.insert(donation.id, donation.clone());
                slot.insert(donation.id);
                Ok((donation.clone(), true))
            }
        }
    }

    async fn find(&self, id: DonationId) -> AppResult<Option<Donation>> {
        Ok(self.donations.get(&id).map(|d| d.value().clone()))
    }

    async fn find_for_match(
        &self,
        request_id: RequestId,
        donor_id: UserId,
    ) -> AppResult<Option<Donation>> {
        let Some(id) = self.by_match.get(&(request_id, donor_id)).map(|r| *r) else {
            return Ok(None);
        };
        self.find(id).await
    }

    async fn count_completed(&self, request_id: RequestId) -> AppResult<u32> {
        Ok(self
            .donations
            .iter()
            .filter(|d| d.request_id == request_id && d.status == DonationStatus::Completed)
            .count() as u32)
    }

    async fn compare_and_swap(&self, current: &Donation, next: &Donation) -> AppResult<bool> {
        let Some(mut stored) = self.donations.get_mut(&current.id) else {
            return Ok(false);
        };
        let unchanged = stored.status == current.status
            && stored.donor_confirmed == current.donor_confirmed
            && stored.recipient_confirmed == current.recipient_confirmed;
        if !unchanged {
            return Ok(false);
        }
        *stored = next.clone();
        Ok(true)
    }
}

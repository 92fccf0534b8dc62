//! Tiered donor selection.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use bloodlink_core::config::MatchingConfig;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::Clock;
use bloodlink_core::types::UserId;
use bloodlink_database::DonorDirectory;
use bloodlink_entity::donor::{Candidate, DonorProfile};
use bloodlink_entity::request::BloodRequest;

use super::compatibility::compatible_donors;
use super::geo::{bounding_box, distance_km};

/// Candidates chosen for a request and the tier that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// Eligible donors, nearest first, ties by donor id.
    pub candidates: Vec<Candidate>,
    /// Radius of the tier the search stopped at.
    pub radius_km: f64,
    /// Zero-based index of that tier.
    pub tier: usize,
}

/// Picks the donors to alert for a request.
#[derive(Clone)]
pub struct DonorSelector {
    donors: Arc<dyn DonorDirectory>,
    clock: Arc<dyn Clock>,
    config: MatchingConfig,
}

impl std::fmt::Debug for DonorSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DonorSelector")
            .field("config", &self.config)
            .finish()
    }
}

impl DonorSelector {
    /// Create a selector over `donors`.
    pub fn new(
        donors: Arc<dyn DonorDirectory>,
        clock: Arc<dyn Clock>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            donors,
            clock,
            config,
        }
    }

    /// Search the configured tiers, widening only while fewer than
    /// `min_candidates` eligible donors were found.
    pub async fn select(&self, request: &BloodRequest) -> AppResult<Selection> {
        let blood_types = compatible_donors(request.patient.blood_type);
        let hospital = &request.hospital.coordinates;
        let already_matched: HashSet<UserId> =
            request.matched_donors.iter().map(|m| m.donor_id).collect();

        let mut selection = Selection {
            candidates: Vec::new(),
            radius_km: 0.0,
            tier: 0,
        };

        for (tier, &radius_km) in self.config.tier_radii_km.iter().enumerate() {
            let area = bounding_box(hospital, radius_km);
            let in_box = self.donors.find_in_area(blood_types, &area).await?;
            let boxed = in_box.len();

            let mut seen = HashSet::with_capacity(boxed);
            let mut candidates: Vec<Candidate> = in_box
                .into_iter()
                .filter(|donor| seen.insert(donor.user_id))
                .filter(|donor| donor.user_id != request.requester_id)
                .filter(|donor| !already_matched.contains(&donor.user_id))
                .filter(|donor| self.eligible(donor, request))
                .filter_map(|donor| {
                    let distance_km = distance_km(hospital, &donor.location);
                    (distance_km <= radius_km).then_some(Candidate { donor, distance_km })
                })
                .collect();

            candidates.sort_by(|a, b| {
                a.distance_km
                    .total_cmp(&b.distance_km)
                    .then_with(|| a.donor.user_id.cmp(&b.donor.user_id))
            });

            debug!(
                request_id = %request.id,
                tier,
                radius_km,
                in_box = boxed,
                eligible = candidates.len(),
                "Donor search tier evaluated"
            );

            selection = Selection {
                candidates,
                radius_km,
                tier,
            };
            if selection.candidates.len() >= self.config.min_candidates {
                break;
            }
        }

        info!(
            request_id = %request.id,
            blood_type = %request.patient.blood_type,
            urgency = %request.urgency,
            tier = selection.tier,
            radius_km = selection.radius_km,
            candidates = selection.candidates.len(),
            "Donors selected"
        );
        Ok(selection)
    }

    fn eligible(&self, donor: &DonorProfile, request: &BloodRequest) -> bool {
        let min_interval = chrono::Duration::days(self.config.min_donation_interval_days);
        donor.available
            && donor.rested(self.clock.now(), min_interval)
            && donor.preferences.accepts(request.urgency)
            && donor.preferences.has_enabled_channel()
    }
}

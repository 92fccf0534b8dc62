//! Donor directory entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::UserId;

use super::preference::NotificationPreferences;
use crate::blood::BloodType;
use crate::request::Coordinates;

/// A registered donor as seen by the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorProfile {
    /// The donor's user id.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Verified phone number in E.164 form, if any.
    pub phone_number: Option<String>,
    /// Blood group.
    pub blood_type: BloodType,
    /// Last known location.
    pub location: Coordinates,
    /// Whether the donor is currently willing to be contacted.
    pub available: bool,
    /// Most recent donation.
    pub last_donation_at: Option<DateTime<Utc>>,
    /// Channel and urgency opt-ins.
    pub preferences: NotificationPreferences,
}

impl DonorProfile {
    /// Whether enough time has passed since the last donation.
    pub fn rested(&self, now: DateTime<Utc>, min_interval: Duration) -> bool {
        self.last_donation_at
            .is_none_or(|last| now.signed_duration_since(last) >= min_interval)
    }
}

/// A donor selected for a request, with their distance to the hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The donor.
    pub donor: DonorProfile,
    /// Great-circle distance to the hospital in kilometres.
    pub distance_km: f64,
}

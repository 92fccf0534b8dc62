//! Blood request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::{RequestId, UserId};

use super::geo::Coordinates;
use super::status::{MatchStatus, RequestStatus};
use crate::blood::{BloodType, Urgency};

/// Who needs the blood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    /// Patient display name.
    pub name: String,
    /// Patient blood group; drives donor compatibility.
    pub blood_type: BloodType,
}

/// Where the donation takes place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    /// Hospital name shown in notifications.
    pub name: String,
    /// Search origin for the donor radius.
    pub coordinates: Coordinates,
}

/// A donor attached to a request, with their answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedDonor {
    /// The donor.
    pub donor_id: UserId,
    /// Donor display name at the time of the answer.
    pub donor_name: String,
    /// Donor blood group.
    pub donor_blood_type: BloodType,
    /// Current answer.
    pub status: MatchStatus,
    /// When the donor answered.
    pub responded_at: Option<DateTime<Utc>>,
    /// Optional note from the donor.
    pub message: Option<String>,
}

/// A request for blood units at a hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The user who created the request. Never a matched donor.
    pub requester_id: UserId,
    /// Patient details.
    pub patient: PatientInfo,
    /// Donation site.
    pub hospital: Hospital,
    /// Urgency level.
    pub urgency: Urgency,
    /// Units needed.
    pub required_units: u32,
    /// Units received so far. Never exceeds `required_units`.
    pub fulfilled_units: u32,
    /// Latest useful donation time.
    pub deadline: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Donors who answered, unique per donor.
    pub matched_donors: Vec<MatchedDonor>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last modified.
    pub updated_at: DateTime<Utc>,
}

impl BloodRequest {
    /// Check if the request still accepts donors.
    pub fn is_active(&self) -> bool {
        self.status == RequestStatus::Active
    }

    /// Check if the donor already appears in `matched_donors`.
    pub fn has_matched(&self, donor_id: UserId) -> bool {
        self.matched_donors.iter().any(|m| m.donor_id == donor_id)
    }

    /// Find the matched entry for a donor.
    pub fn matched(&self, donor_id: UserId) -> Option<&MatchedDonor> {
        self.matched_donors.iter().find(|m| m.donor_id == donor_id)
    }

    /// Units still outstanding.
    pub fn remaining_units(&self) -> u32 {
        self.required_units.saturating_sub(self.fulfilled_units)
    }

    /// Bring `fulfilled_units` up to `completed` donations, capped at
    /// `required_units`. Never lowers the count, so applying the same total
    /// twice changes nothing.
    ///
    /// Returns `true` if this call moved the request to `Fulfilled`.
    pub fn sync_fulfilled_units(&mut self, completed: u32, now: DateTime<Utc>) -> bool {
        let target = completed.min(self.required_units);
        if target <= self.fulfilled_units {
            return false;
        }
        self.fulfilled_units = target;
        self.updated_at = now;
        if self.fulfilled_units == self.required_units && self.status == RequestStatus::Active {
            self.status = RequestStatus::Fulfilled;
            return true;
        }
        false
    }

    /// Insert or replace the donor's entry, keeping one entry per donor.
    pub fn upsert_match(&mut self, entry: MatchedDonor) {
        match self
            .matched_donors
            .iter_mut()
            .find(|m| m.donor_id == entry.donor_id)
        {
            Some(existing) => *existing = entry,
            None => self.matched_donors.push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(required: u32) -> BloodRequest {
        let now = Utc::now();
        BloodRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            patient: PatientInfo {
                name: "Patient".into(),
                blood_type: BloodType::APos,
            },
            hospital: Hospital {
                name: "Centre Hospitalier".into(),
                coordinates: Coordinates { lat: 18.07, lng: -15.95 },
            },
            urgency: Urgency::Urgent,
            required_units: required,
            fulfilled_units: 0,
            deadline: None,
            status: RequestStatus::Active,
            matched_donors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fulfillment_caps_at_required() {
        let mut req = request(2);
        let now = Utc::now();
        assert!(!req.sync_fulfilled_units(1, now));
        assert!(req.sync_fulfilled_units(2, now));
        assert_eq!(req.status, RequestStatus::Fulfilled);
        assert!(!req.sync_fulfilled_units(3, now));
        assert_eq!(req.fulfilled_units, 2);
    }

    #[test]
    fn test_sync_is_idempotent_and_never_lowers() {
        let mut req = request(3);
        let now = Utc::now();
        req.sync_fulfilled_units(2, now);
        req.sync_fulfilled_units(2, now);
        assert_eq!(req.fulfilled_units, 2);
        req.sync_fulfilled_units(1, now);
        assert_eq!(req.fulfilled_units, 2);
        assert_eq!(req.status, RequestStatus::Active);
    }

    #[test]
    fn test_upsert_keeps_single_entry_per_donor() {
        let mut req = request(1);
        let donor = UserId::new();
        let entry = |status| MatchedDonor {
            donor_id: donor,
            donor_name: "Donor".into(),
            donor_blood_type: BloodType::ONeg,
            status,
            responded_at: None,
            message: None,
        };
        req.upsert_match(entry(MatchStatus::Pending));
        req.upsert_match(entry(MatchStatus::Accepted));
        assert_eq!(req.matched_donors.len(), 1);
        assert_eq!(req.matched(donor).unwrap().status, MatchStatus::Accepted);
    }
}

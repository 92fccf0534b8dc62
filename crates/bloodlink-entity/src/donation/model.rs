//! Donation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::{DonationId, RequestId, UserId};

use super::status::{ConfirmingParty, DonationStatus};
use crate::blood::BloodType;

/// A donation created when a donor accepts a match. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    /// Unique donation identifier.
    pub id: DonationId,
    /// The request being served.
    pub request_id: RequestId,
    /// The donor.
    pub donor_id: UserId,
    /// The requester receiving the units.
    pub recipient_id: UserId,
    /// Donor blood group.
    pub blood_type: BloodType,
    /// When the blood was drawn, if known.
    pub donation_date: Option<DateTime<Utc>>,
    /// Donor confirmation flag.
    pub donor_confirmed: bool,
    /// When the donor confirmed.
    pub donor_confirmed_at: Option<DateTime<Utc>>,
    /// Recipient confirmation flag.
    pub recipient_confirmed: bool,
    /// When the recipient confirmed.
    pub recipient_confirmed_at: Option<DateTime<Utc>>,
    /// Confirmation state.
    pub status: DonationStatus,
    /// Volume in millilitres, if recorded.
    pub volume_ml: Option<u32>,
    /// Reason given when the donation was disputed.
    pub dispute_reason: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    /// A fresh, unconfirmed donation.
    pub fn new_pending(
        request_id: RequestId,
        donor_id: UserId,
        recipient_id: UserId,
        blood_type: BloodType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DonationId::new(),
            request_id,
            donor_id,
            recipient_id,
            blood_type,
            donation_date: None,
            donor_confirmed: false,
            donor_confirmed_at: None,
            recipient_confirmed: false,
            recipient_confirmed_at: None,
            status: DonationStatus::Pending,
            volume_ml: None,
            dispute_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The party a user plays on this donation, if any.
    pub fn party_of(&self, user_id: UserId) -> Option<ConfirmingParty> {
        if user_id == self.donor_id {
            Some(ConfirmingParty::Donor)
        } else if user_id == self.recipient_id {
            Some(ConfirmingParty::Recipient)
        } else {
            None
        }
    }

    /// Whether the given party has already confirmed.
    pub fn is_confirmed_by(&self, party: ConfirmingParty) -> bool {
        match party {
            ConfirmingParty::Donor => self.donor_confirmed,
            ConfirmingParty::Recipient => self.recipient_confirmed,
        }
    }
}

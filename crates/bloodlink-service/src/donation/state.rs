//! The donation confirmation state machine.
//!
//! `pending → donor_confirmed → completed`, with `disputed` reachable from
//! either non-terminal state. Status is recomputed from the two
//! confirmation flags on every confirmation; `disputed` is only ever set by
//! an explicit dispute.

use chrono::{DateTime, Utc};

use bloodlink_core::error::AppError;
use bloodlink_entity::donation::{ConfirmingParty, Donation, DonationStatus};

/// An action against a donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// One party confirms the donation took place.
    Confirm(ConfirmingParty),
    /// A party reports a mismatch.
    Dispute {
        /// Free-text reason.
        reason: Option<String>,
    },
}

/// Status implied by the confirmation flags.
///
/// A recipient confirmation alone leaves the donation `pending`.
pub fn derive_status(donor_confirmed: bool, recipient_confirmed: bool) -> DonationStatus {
    match (donor_confirmed, recipient_confirmed) {
        (true, true) => DonationStatus::Completed,
        (true, false) => DonationStatus::DonorConfirmed,
        (false, _) => DonationStatus::Pending,
    }
}

/// Apply `transition` to `current`.
///
/// Returns `Ok(None)` when the transition changes nothing (a repeated
/// confirmation, confirming a completed donation, re-disputing), or the
/// next record. Confirming a disputed donation and disputing a completed
/// one are conflicts.
pub fn apply(
    current: &Donation,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Option<Donation>, AppError> {
    match transition {
        Transition::Confirm(party) => {
            match current.status {
                DonationStatus::Disputed => {
                    return Err(AppError::conflict(format!(
                        "Donation {} is disputed and cannot be confirmed",
                        current.id
                    )));
                }
                DonationStatus::Completed => return Ok(None),
                DonationStatus::Pending | DonationStatus::DonorConfirmed => {}
            }
            if current.is_confirmed_by(*party) {
                return Ok(None);
            }

            let mut next = current.clone();
            match party {
                ConfirmingParty::Donor => {
                    next.donor_confirmed = true;
                    next.donor_confirmed_at = Some(now);
                }
                ConfirmingParty::Recipient => {
                    next.recipient_confirmed = true;
                    next.recipient_confirmed_at = Some(now);
                }
            }
            next.status = derive_status(next.donor_confirmed, next.recipient_confirmed);
            if next.status == DonationStatus::Completed && next.donation_date.is_none() {
                next.donation_date = Some(now);
            }
            next.updated_at = now;
            Ok(Some(next))
        }
        Transition::Dispute { reason } => match current.status {
            DonationStatus::Disputed => Ok(None),
            DonationStatus::Completed => Err(AppError::conflict(format!(
                "Donation {} is already completed",
                current.id
            ))),
            DonationStatus::Pending | DonationStatus::DonorConfirmed => {
                let mut next = current.clone();
                next.status = DonationStatus::Disputed;
                next.dispute_reason = reason.clone();
                next.updated_at = now;
                Ok(Some(next))
            }
        },
    }
}

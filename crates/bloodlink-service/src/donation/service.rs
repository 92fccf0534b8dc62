//! Donation confirmation service.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, request_room};
use bloodlink_core::types::{DonationId, RequestId, UserId};
use bloodlink_database::{DonationRepository, RequestRepository};
use bloodlink_dispatch::NotificationDispatcher;
use bloodlink_entity::donation::{ConfirmingParty, Donation, DonationStatus};
use bloodlink_entity::notification::{Notification, NotificationPayload};
use bloodlink_entity::request::BloodRequest;

use super::state::{Transition, apply};

/// Realtime event emitted to a request's room when a donation moves.
pub const DONATION_UPDATED_EVENT: &str = "donation:updated";

/// Attempts before a confirmation racing other writers gives up.
const MAX_SWAP_ATTEMPTS: usize = 5;

/// Drives donations through confirmation and dispute.
#[derive(Clone)]
pub struct DonationService {
    donations: Arc<dyn DonationRepository>,
    requests: Arc<dyn RequestRepository>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DonationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DonationService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl DonationService {
    /// Creates a new donation service.
    pub fn new(
        donations: Arc<dyn DonationRepository>,
        requests: Arc<dyn RequestRepository>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            donations,
            requests,
            dispatcher,
            clock,
        }
    }

    /// Load a donation.
    pub async fn get(&self, id: DonationId) -> AppResult<Donation> {
        self.donations
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Donation {id} not found")))
    }

    /// Record `party`'s confirmation. Repeating it is a no-op.
    pub async fn confirm(
        &self,
        id: DonationId,
        party: ConfirmingParty,
    ) -> AppResult<DonationStatus> {
        let donation = self.transition(id, Transition::Confirm(party), Some(party)).await?;
        Ok(donation.status)
    }

    /// Confirm on behalf of `user_id`, who must be the donor or recipient.
    pub async fn confirm_as(
        &self,
        id: DonationId,
        user_id: UserId,
    ) -> AppResult<DonationStatus> {
        let party = self.party(id, user_id).await?;
        self.confirm(id, party).await
    }

    /// Mark the donation disputed.
    pub async fn dispute(
        &self,
        id: DonationId,
        reason: Option<String>,
    ) -> AppResult<DonationStatus> {
        let donation = self
            .transition(id, Transition::Dispute { reason }, None)
            .await?;
        Ok(donation.status)
    }

    /// Dispute on behalf of `user_id`, who must be the donor or recipient.
    pub async fn dispute_as(
        &self,
        id: DonationId,
        user_id: UserId,
        reason: Option<String>,
    ) -> AppResult<DonationStatus> {
        self.party(id, user_id).await?;
        self.dispute(id, reason).await
    }

    async fn party(&self, id: DonationId, user_id: UserId) -> AppResult<ConfirmingParty> {
        self.get(id).await?.party_of(user_id).ok_or_else(|| {
            AppError::authorization(format!("User {user_id} is not a party to donation {id}"))
        })
    }

    /// Read, apply, compare-and-swap; re-read and retry when another writer
    /// got in first.
    async fn transition(
        &self,
        id: DonationId,
        transition: Transition,
        actor: Option<ConfirmingParty>,
    ) -> AppResult<Donation> {
        for _ in 0..MAX_SWAP_ATTEMPTS {
            let current = self.get(id).await?;
            let Some(next) = apply(&current, &transition, self.clock.now())? else {
                // Repairs a request whose count was missed after completion.
                if current.status == DonationStatus::Completed {
                    self.sync_fulfillment(current.request_id).await?;
                }
                return Ok(current);
            };

            if self.donations.compare_and_swap(&current, &next).await? {
                info!(
                    donation_id = %id,
                    from = %current.status,
                    to = %next.status,
                    "Donation status changed"
                );
                self.after_change(&current, &next, actor).await;
                return Ok(next);
            }
        }

        Err(AppError::conflict(format!(
            "Donation {id} is being updated concurrently, try again"
        )))
    }

    /// Recount the request's completed donations. Safe to repeat.
    async fn sync_fulfillment(&self, request_id: RequestId) -> AppResult<BloodRequest> {
        let completed = self.donations.count_completed(request_id).await?;
        self.requests
            .sync_fulfilled_units(request_id, completed, self.clock.now())
            .await
    }

    /// Side effects of a committed transition. Failures are logged only.
    async fn after_change(
        &self,
        previous: &Donation,
        next: &Donation,
        actor: Option<ConfirmingParty>,
    ) {
        if next.status == DonationStatus::Completed && previous.status != DonationStatus::Completed
        {
            match self.sync_fulfillment(next.request_id).await {
                Ok(request) => info!(
                    request_id = %request.id,
                    fulfilled_units = request.fulfilled_units,
                    required_units = request.required_units,
                    status = %request.status,
                    "Fulfilled units updated"
                ),
                Err(e) => warn!(
                    donation_id = %next.id,
                    request_id = %next.request_id,
                    error = %e,
                    "Fulfilled units not updated"
                ),
            }
        }

        let audience: Vec<UserId> = match (next.status, actor) {
            (DonationStatus::Completed, _) | (_, None) => vec![next.donor_id, next.recipient_id],
            (_, Some(ConfirmingParty::Donor)) => vec![next.recipient_id],
            (_, Some(ConfirmingParty::Recipient)) => vec![next.donor_id],
        };
        let (title, message) = describe(next, actor);
        for user_id in audience {
            let notice = donation_notice(next, user_id, title, message, self.clock.now());
            if let Err(e) = self.dispatcher.notify(&notice).await {
                warn!(
                    donation_id = %next.id,
                    user_id = %user_id,
                    error = %e,
                    "Donation notice not stored"
                );
            }
        }

        let event = json!({
            "donation_id": next.id,
            "request_id": next.request_id,
            "status": next.status,
        });
        if let Err(e) = self
            .dispatcher
            .realtime()
            .emit(&request_room(next.request_id), DONATION_UPDATED_EVENT, event)
            .await
        {
            warn!(donation_id = %next.id, error = %e, "Donation update not broadcast");
        }
    }
}

fn describe(donation: &Donation, actor: Option<ConfirmingParty>) -> (&'static str, &'static str) {
    match (donation.status, actor) {
        (DonationStatus::Completed, _) => (
            "Donation completed",
            "Both sides confirmed the donation. Thank you!",
        ),
        (DonationStatus::Disputed, _) => (
            "Donation disputed",
            "A donation was disputed and will be reviewed.",
        ),
        (DonationStatus::DonorConfirmed, _) => (
            "Donor confirmed",
            "Your donor confirmed the donation. Please confirm once you have received it.",
        ),
        (DonationStatus::Pending, Some(ConfirmingParty::Recipient)) => (
            "Recipient confirmed",
            "The recipient confirmed your donation. Please confirm it too.",
        ),
        (DonationStatus::Pending, _) => (
            "Donor accepted",
            "A donor accepted your request and will contact the hospital.",
        ),
    }
}

/// A `donation_update` notification for one party.
pub(crate) fn donation_notice(
    donation: &Donation,
    user_id: UserId,
    title: &str,
    message: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Notification {
    Notification::new(
        user_id,
        title,
        message,
        NotificationPayload::DonationUpdate {
            donation_id: donation.id,
            request_id: donation.request_id,
            status: donation.status,
        },
        false,
        now,
    )
}

/// Title and message for a freshly accepted match.
pub(crate) fn accepted_notice(donation: &Donation) -> (&'static str, &'static str) {
    describe(donation, Some(ConfirmingParty::Donor))
}

//! Request service: dispatch on creation, donor responses.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use bloodlink_core::error::{AppError, ErrorKind};
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, request_room};
use bloodlink_core::types::{RequestId, UserId};
use bloodlink_database::{DonationRepository, DonorDirectory, RequestRepository};
use bloodlink_dispatch::{DispatchSummary, NotificationDispatcher};
use bloodlink_entity::donation::Donation;
use bloodlink_entity::request::{BloodRequest, MatchStatus, MatchedDonor};

use crate::donation::service::{accepted_notice, donation_notice};
use crate::matching::{DonorSelector, can_donate};

/// Realtime event emitted to a request's room when a donor answers.
pub const MATCH_UPDATED_EVENT: &str = "match:updated";

/// Longest response message kept on a match entry.
const MAX_MESSAGE_CHARS: usize = 500;

/// A donor's answer to a blood request alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResponse {
    /// Willing to donate.
    Accept,
    /// Not able to help this time.
    Decline,
}

/// Result of [`RequestService::respond_to_match`].
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    /// The request.
    pub request_id: RequestId,
    /// The donor's entry after the response.
    pub entry: MatchedDonor,
    /// The donation opened by an acceptance.
    pub donation: Option<Donation>,
}

/// Handles new requests and donor responses.
#[derive(Clone)]
pub struct RequestService {
    requests: Arc<dyn RequestRepository>,
    donations: Arc<dyn DonationRepository>,
    donors: Arc<dyn DonorDirectory>,
    selector: DonorSelector,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestService")
            .field("selector", &self.selector)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl RequestService {
    /// Creates a new request service.
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        donations: Arc<dyn DonationRepository>,
        donors: Arc<dyn DonorDirectory>,
        selector: DonorSelector,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            requests,
            donations,
            donors,
            selector,
            dispatcher,
            clock,
        }
    }

    /// Load a request.
    pub async fn get(&self, id: RequestId) -> AppResult<BloodRequest> {
        self.requests
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))
    }

    /// Store `request` if it is new, then select and alert donors.
    ///
    /// Calling this again for the same request id re-runs selection against
    /// the stored record; donors already alerted are not alerted again.
    pub async fn request_created(&self, request: BloodRequest) -> AppResult<DispatchSummary> {
        validate(&request)?;

        let request = match self.requests.insert(&request).await {
            Ok(()) => request,
            Err(e) if e.is(ErrorKind::Conflict) => {
                info!(request_id = %request.id, "Request already stored, re-running dispatch");
                self.get(request.id).await?
            }
            Err(e) => return Err(e),
        };

        if !request.is_active() {
            info!(
                request_id = %request.id,
                status = %request.status,
                "Request not active, nothing to dispatch"
            );
            return Ok(DispatchSummary::empty(request.id));
        }

        if let Err(e) = self
            .dispatcher
            .realtime()
            .join_room(&request_room(request.id))
            .await
        {
            warn!(request_id = %request.id, error = %e, "Could not join request room");
        }

        let selection = self.selector.select(&request).await?;
        Ok(self.dispatcher.dispatch(&request, selection.candidates).await)
    }

    /// Record a donor's answer to a request.
    ///
    /// Each donor has at most one entry in `matched_donors`; answering again
    /// replaces it. Accepting opens a pending donation (one per request and
    /// donor) and tells the requester.
    pub async fn respond_to_match(
        &self,
        request_id: RequestId,
        donor_id: UserId,
        response: MatchResponse,
        message: Option<String>,
    ) -> AppResult<MatchOutcome> {
        let request = self.get(request_id).await?;
        if donor_id == request.requester_id {
            return Err(AppError::validation(
                "A requester cannot respond to their own request",
            ));
        }
        if !request.is_active() {
            return Err(AppError::conflict(format!(
                "Request {request_id} is {} and no longer accepts donors",
                request.status
            )));
        }

        let donor = self
            .donors
            .find(donor_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Donor {donor_id} not registered")))?;

        let existing = self.donations.find_for_match(request_id, donor_id).await?;
        let status = match response {
            MatchResponse::Accept => {
                if !can_donate(donor.blood_type, request.patient.blood_type) {
                    return Err(AppError::validation(format!(
                        "{} blood cannot be given to a {} patient",
                        donor.blood_type, request.patient.blood_type
                    )));
                }
                MatchStatus::Accepted
            }
            MatchResponse::Decline => {
                if existing.is_some() {
                    return Err(AppError::conflict(
                        "Donor already accepted and a donation is open",
                    ));
                }
                MatchStatus::Declined
            }
        };

        let now = self.clock.now();
        let mut entry = MatchedDonor {
            donor_id,
            donor_name: donor.name.clone(),
            donor_blood_type: donor.blood_type,
            status,
            responded_at: Some(now),
            message: message
                .map(|m| m.trim().chars().take(MAX_MESSAGE_CHARS).collect::<String>())
                .filter(|m| !m.is_empty()),
        };
        // An acceptance opens its donation before the entry says accepted,
        // so a decline that lands after it always sees the donation.
        let donation = match response {
            MatchResponse::Accept => {
                let donation = self.open_donation(&request, &entry, now).await?;
                self.requests.upsert_match(request_id, &entry, now).await?;
                Some(donation)
            }
            MatchResponse::Decline => {
                self.requests.upsert_match(request_id, &entry, now).await?;
                if self.donations.find_for_match(request_id, donor_id).await?.is_some() {
                    entry.status = MatchStatus::Accepted;
                    entry.message = None;
                    self.requests.upsert_match(request_id, &entry, now).await?;
                    warn!(
                        request_id = %request_id,
                        donor_id = %donor_id,
                        "Decline crossed an acceptance, entry restored"
                    );
                    return Err(AppError::conflict(
                        "Donor already accepted and a donation is open",
                    ));
                }
                None
            }
        };

        info!(
            request_id = %request_id,
            donor_id = %donor_id,
            status = %status,
            "Donor responded"
        );

        let event = json!({ "request_id": request_id, "entry": &entry });
        if let Err(e) = self
            .dispatcher
            .realtime()
            .emit(&request_room(request_id), MATCH_UPDATED_EVENT, event)
            .await
        {
            warn!(request_id = %request_id, error = %e, "Match update not broadcast");
        }

        Ok(MatchOutcome {
            request_id,
            entry,
            donation,
        })
    }

    async fn open_donation(
        &self,
        request: &BloodRequest,
        entry: &MatchedDonor,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Donation> {
        let candidate = Donation::new_pending(
            request.id,
            entry.donor_id,
            request.requester_id,
            entry.donor_blood_type,
            now,
        );
        let (donation, created) = self.donations.insert_if_absent(&candidate).await?;

        if created {
            let (title, message) = accepted_notice(&donation);
            let notice = donation_notice(&donation, request.requester_id, title, message, now);
            if let Err(e) = self.dispatcher.notify(&notice).await {
                warn!(donation_id = %donation.id, error = %e, "Requester notice not stored");
            }
        }
        Ok(donation)
    }
}

fn validate(request: &BloodRequest) -> AppResult<()> {
    request.hospital.coordinates.validate()?;
    if request.required_units == 0 {
        return Err(AppError::validation("required_units must be at least 1"));
    }
    if request.fulfilled_units > request.required_units {
        return Err(AppError::validation(
            "fulfilled_units cannot exceed required_units",
        ));
    }
    if request.hospital.name.trim().is_empty() {
        return Err(AppError::validation("Hospital name is required"));
    }
    if request.matched_donors.iter().any(|m| m.donor_id == request.requester_id) {
        return Err(AppError::validation(
            "The requester cannot be a matched donor on their own request",
        ));
    }
    Ok(())
}

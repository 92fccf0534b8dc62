//! The matching engine facade.
//!
//! Wires the verification store, rate limiter, selector, dispatcher and
//! donation state machine over one set of repositories and exposes the
//! operations the surrounding application calls.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use bloodlink_auth::{
    IssueReceipt, PhoneClaim, RateLimiter, SessionClaims, SessionIssuer, SessionToken,
    VerificationCodeStore, normalize_phone,
};
use bloodlink_core::config::AppConfig;
use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, RealtimeChannel, SmsProvider};
use bloodlink_core::types::{DonationId, NotificationId, RequestId, UserId};
use bloodlink_database::{DonorDirectory, Repositories};
use bloodlink_dispatch::{DispatchSummary, NotificationDispatcher};
use bloodlink_entity::donation::{ConfirmingParty, Donation, DonationStatus};
use bloodlink_entity::donor::DonorProfile;
use bloodlink_entity::notification::{DeliveryRecord, Notification};
use bloodlink_entity::request::BloodRequest;

use crate::donation::DonationService;
use crate::matching::DonorSelector;
use crate::notification::NotificationService;
use crate::request::{MatchOutcome, MatchResponse, RequestService};

/// Everything the engine is built from.
pub struct EngineParts {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Storage backend.
    pub repositories: Repositories,
    /// SMS provider (HTTP or development fallback).
    pub sms: Arc<dyn SmsProvider>,
    /// Realtime channel (in-process hub or remote link).
    pub realtime: Arc<dyn RealtimeChannel>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MaintenanceReport {
    /// Expired or consumed verification codes deleted.
    pub purged_codes: u64,
    /// Idle rate-limit windows dropped.
    pub pruned_windows: usize,
}

/// The blood request notification and donor matching engine.
#[derive(Clone)]
pub struct MatchingEngine {
    codes: Arc<VerificationCodeStore>,
    limiter: Arc<RateLimiter>,
    sessions: Arc<SessionIssuer>,
    donors: Arc<dyn DonorDirectory>,
    clock: Arc<dyn Clock>,
    requests: RequestService,
    donations: DonationService,
    notifications: NotificationService,
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("codes", &self.codes)
            .field("requests", &self.requests)
            .finish_non_exhaustive()
    }
}

impl MatchingEngine {
    /// Build the engine and all of its services.
    pub fn new(parts: EngineParts) -> Self {
        let EngineParts {
            config,
            repositories: repos,
            sms,
            realtime,
            clock,
        } = parts;

        let limiter = Arc::new(RateLimiter::new(
            config.auth.rate_limits.clone(),
            clock.clone(),
        ));
        let codes = Arc::new(VerificationCodeStore::new(
            repos.codes.clone(),
            limiter.clone(),
            sms.clone(),
            clock.clone(),
            config.auth.verification.clone(),
            config.environment,
            &config.dispatch,
        ));
        let sessions = Arc::new(SessionIssuer::new(&config.auth));

        let dispatcher = NotificationDispatcher::new(
            repos.notifications.clone(),
            sms,
            realtime.clone(),
            clock.clone(),
            config.dispatch.clone(),
        );
        let selector = DonorSelector::new(
            repos.donors.clone(),
            clock.clone(),
            config.matching.clone(),
        );
        let requests = RequestService::new(
            repos.requests.clone(),
            repos.donations.clone(),
            repos.donors.clone(),
            selector,
            dispatcher.clone(),
            clock.clone(),
        );
        let donations = DonationService::new(
            repos.donations.clone(),
            repos.requests.clone(),
            dispatcher,
            clock.clone(),
        );
        let notifications =
            NotificationService::new(repos.notifications.clone(), realtime, clock.clone());

        Self {
            codes,
            limiter,
            sessions,
            donors: repos.donors,
            clock,
            requests,
            donations,
            notifications,
        }
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -- Phone verification --

    /// Issue and text a verification code.
    pub async fn issue_code(&self, phone: &str) -> AppResult<IssueReceipt> {
        self.codes.issue(phone).await
    }

    /// Redeem a verification code.
    pub async fn verify_phone(&self, phone: &str, code: &str) -> AppResult<PhoneClaim> {
        self.codes.verify(phone, code).await
    }

    /// Redeem a code and mint a session token for the verified phone.
    pub async fn sign_in(&self, phone: &str, code: &str) -> AppResult<(PhoneClaim, SessionToken)> {
        let claim = self.verify_phone(phone, code).await?;
        let token = self.sessions.issue(&claim)?;
        Ok((claim, token))
    }

    /// Validate a session token.
    pub fn authenticate(&self, token: &str) -> AppResult<SessionClaims> {
        self.sessions.validate(token)
    }

    // -- Donor directory --

    /// Add or update a donor in the directory.
    pub async fn register_donor(&self, mut donor: DonorProfile) -> AppResult<DonorProfile> {
        donor.location.validate()?;
        donor.name = donor.name.trim().to_string();
        if donor.name.is_empty() {
            return Err(AppError::validation("Donor name is required"));
        }
        donor.phone_number = donor
            .phone_number
            .as_deref()
            .map(normalize_phone)
            .transpose()?;
        self.donors.upsert(&donor).await?;
        Ok(donor)
    }

    // -- Requests --

    /// Select and alert donors for a new request.
    pub async fn request_created(&self, request: BloodRequest) -> AppResult<DispatchSummary> {
        self.requests.request_created(request).await
    }

    /// Load a request.
    pub async fn request(&self, id: RequestId) -> AppResult<BloodRequest> {
        self.requests.get(id).await
    }

    /// Record a donor's answer to a request.
    pub async fn respond_to_match(
        &self,
        request_id: RequestId,
        donor_id: UserId,
        response: MatchResponse,
        message: Option<String>,
    ) -> AppResult<MatchOutcome> {
        self.requests
            .respond_to_match(request_id, donor_id, response, message)
            .await
    }

    // -- Donations --

    /// Load a donation.
    pub async fn donation(&self, id: DonationId) -> AppResult<Donation> {
        self.donations.get(id).await
    }

    /// Record a party's confirmation.
    pub async fn confirm_donation(
        &self,
        id: DonationId,
        party: ConfirmingParty,
    ) -> AppResult<DonationStatus> {
        self.donations.confirm(id, party).await
    }

    /// Confirm as `user_id`, who must be the donor or the recipient.
    pub async fn confirm_donation_as(
        &self,
        id: DonationId,
        user_id: UserId,
    ) -> AppResult<DonationStatus> {
        self.donations.confirm_as(id, user_id).await
    }

    /// Mark a donation disputed.
    pub async fn dispute_donation(
        &self,
        id: DonationId,
        reason: Option<String>,
    ) -> AppResult<DonationStatus> {
        self.donations.dispute(id, reason).await
    }

    /// Dispute as `user_id`, who must be the donor or the recipient.
    pub async fn dispute_donation_as(
        &self,
        id: DonationId,
        user_id: UserId,
        reason: Option<String>,
    ) -> AppResult<DonationStatus> {
        self.donations.dispute_as(id, user_id, reason).await
    }

    // -- Notifications --

    /// Mark a notification read and sync other sessions.
    pub async fn mark_notification_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> AppResult<Notification> {
        self.notifications.mark_read(user_id, notification_id).await
    }

    /// Unread notifications for a user.
    pub async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        self.notifications.unread_count(user_id).await
    }

    /// Newest notifications for a user.
    pub async fn notifications_for(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<Notification>> {
        self.notifications.list(user_id, limit).await
    }

    /// Delivery outcomes for one of the user's notifications.
    pub async fn notification_deliveries(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<Vec<DeliveryRecord>> {
        self.notifications.deliveries(user_id, notification_id).await
    }

    // -- Maintenance --

    /// Purge expired verification codes and idle rate-limit windows.
    pub async fn run_maintenance(&self) -> AppResult<MaintenanceReport> {
        let purged_codes = self.codes.purge_expired().await?;
        let pruned_windows = self.limiter.prune();
        Ok(MaintenanceReport {
            purged_codes,
            pruned_windows,
        })
    }

    /// Run maintenance every `interval` until the task is aborted.
    pub fn spawn_maintenance(&self, interval: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match engine.run_maintenance().await {
                    Ok(report) => info!(
                        purged_codes = report.purged_codes,
                        pruned_windows = report.pruned_windows,
                        "Maintenance pass finished"
                    ),
                    Err(e) => error!(error = %e, "Maintenance pass failed"),
                }
            }
        })
    }
}

//! Repository traits.
//!
//! Every mutation that two callers may race on is expressed as a single
//! conditional operation so both backends can make it atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bloodlink_core::result::AppResult;
use bloodlink_core::types::{DonationId, NotificationId, RequestId, UserId};
use bloodlink_entity::blood::BloodType;
use bloodlink_entity::donation::Donation;
use bloodlink_entity::donor::DonorProfile;
use bloodlink_entity::notification::{DeliveryRecord, Notification};
use bloodlink_entity::request::{BloodRequest, BoundingBox, MatchedDonor};
use bloodlink_entity::verification::VerificationCode;

/// Storage for the single live verification code per phone number.
#[async_trait]
pub trait VerificationCodeRepository: Send + Sync + 'static {
    /// Store `code`, replacing any prior record for the same number.
    async fn replace(&self, code: &VerificationCode) -> AppResult<()>;

    /// The record for `phone`, hidden once expired.
    async fn find_live(&self, phone: &str, now: DateTime<Utc>)
    -> AppResult<Option<VerificationCode>>;

    /// Mark the record verified if it is still unverified, unexpired and
    /// carries `code_hash`. Returns `true` for exactly one caller.
    async fn mark_verified(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Delete expired and consumed records. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Blood requests with their embedded matched-donor list.
#[async_trait]
pub trait RequestRepository: Send + Sync + 'static {
    /// Store a new request. Fails with `Conflict` if the id exists.
    async fn insert(&self, request: &BloodRequest) -> AppResult<()>;

    /// Load a request.
    async fn find(&self, id: RequestId) -> AppResult<Option<BloodRequest>>;

    /// Insert or replace one donor's entry, preserving list order.
    async fn upsert_match(
        &self,
        id: RequestId,
        entry: &MatchedDonor,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Raise `fulfilled_units` to `completed` (capped at `required_units`,
    /// never lowered) and flip to `fulfilled` on reaching it. Idempotent.
    /// Returns the updated request.
    async fn sync_fulfilled_units(
        &self,
        id: RequestId,
        completed: u32,
        now: DateTime<Utc>,
    ) -> AppResult<BloodRequest>;
}

/// Donation audit records.
#[async_trait]
pub trait DonationRepository: Send + Sync + 'static {
    /// Store `donation` unless one already exists for the same request and
    /// donor. Returns the stored record and whether it was created.
    async fn insert_if_absent(&self, donation: &Donation) -> AppResult<(Donation, bool)>;

    /// Load a donation.
    async fn find(&self, id: DonationId) -> AppResult<Option<Donation>>;

    /// The donation for a request and donor, if any.
    async fn find_for_match(
        &self,
        request_id: RequestId,
        donor_id: UserId,
    ) -> AppResult<Option<Donation>>;

    /// Number of completed donations for a request.
    async fn count_completed(&self, request_id: RequestId) -> AppResult<u32>;

    /// Replace `current` with `next` only if the stored confirmation flags
    /// and status still equal those of `current`.
    async fn compare_and_swap(&self, current: &Donation, next: &Donation) -> AppResult<bool>;
}

/// In-app notifications and their delivery records.
#[async_trait]
pub trait NotificationRepository: Send + Sync + 'static {
    /// Store a notification unconditionally.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Store a blood request alert unless one exists for the same request
    /// and donor. Returns the stored record and whether it was created.
    async fn insert_if_absent(
        &self,
        notification: &Notification,
    ) -> AppResult<(Notification, bool)>;

    /// Load a notification.
    async fn find(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Notification>>;

    /// Unread notifications for a user.
    async fn count_unread(&self, user_id: UserId) -> AppResult<u64>;

    /// Set `read` on a notification owned by `user_id`. Returns the record,
    /// or `None` if no such notification belongs to the user.
    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Append a channel outcome.
    async fn record_delivery(&self, record: &DeliveryRecord) -> AppResult<()>;

    /// Outcomes recorded for a notification, oldest first.
    async fn deliveries(&self, id: NotificationId) -> AppResult<Vec<DeliveryRecord>>;
}

/// The donor directory consulted by the selector.
#[async_trait]
pub trait DonorDirectory: Send + Sync + 'static {
    /// Insert or replace a donor.
    async fn upsert(&self, donor: &DonorProfile) -> AppResult<()>;

    /// Load a donor.
    async fn find(&self, user_id: UserId) -> AppResult<Option<DonorProfile>>;

    /// Donors of the given blood types inside the box.
    async fn find_in_area(
        &self,
        blood_types: &[BloodType],
        area: &BoundingBox,
    ) -> AppResult<Vec<DonorProfile>>;
}

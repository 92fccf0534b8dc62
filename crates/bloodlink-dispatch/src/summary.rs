//! Per-donor, per-channel dispatch results.

use serde::Serialize;

use bloodlink_core::types::{NotificationId, RequestId, UserId};
use bloodlink_entity::notification::{DeliveryChannel, DeliveryOutcome};

/// What happened to one donor during a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DonorStatus {
    /// A notification was stored and channel sends finished.
    Notified,
    /// An earlier dispatch already notified this donor for the request.
    AlreadyNotified,
    /// Still in flight when the dispatch timeout elapsed. The task keeps
    /// running and records its own outcomes.
    Pending,
    /// The notification could not be stored; nothing was sent.
    Failed,
}

/// Outcome of one channel for one donor.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    /// Channel used.
    pub channel: DeliveryChannel,
    /// How the send ended.
    pub outcome: DeliveryOutcome,
    /// Provider calls made.
    pub attempts: u32,
}

/// Dispatch result for one donor.
#[derive(Debug, Clone, Serialize)]
pub struct DonorOutcome {
    /// The donor.
    pub donor_id: UserId,
    /// Distance to the hospital.
    pub distance_km: f64,
    /// Overall status.
    pub status: DonorStatus,
    /// The stored notification, when known.
    pub notification_id: Option<NotificationId>,
    /// One entry per attempted or skipped channel.
    pub channels: Vec<ChannelReport>,
    /// Storage error text for [`DonorStatus::Failed`].
    pub error: Option<String>,
}

impl DonorOutcome {
    pub(crate) fn pending(donor_id: UserId, distance_km: f64) -> Self {
        Self {
            donor_id,
            distance_km,
            status: DonorStatus::Pending,
            notification_id: None,
            channels: Vec::new(),
            error: None,
        }
    }

    /// The report for `channel`, if that channel was handled.
    pub fn channel(&self, channel: DeliveryChannel) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}

/// Result of dispatching one request to its candidates.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    /// The request.
    pub request_id: RequestId,
    /// Donors in candidate order (nearest first).
    pub donors: Vec<DonorOutcome>,
    /// Whether the dispatch timeout cut collection short.
    pub timed_out: bool,
    /// Wall time spent waiting for tasks.
    pub elapsed_ms: u64,
}

impl DispatchSummary {
    /// A summary for a request nobody could be matched to.
    pub fn empty(request_id: RequestId) -> Self {
        Self {
            request_id,
            donors: Vec::new(),
            timed_out: false,
            elapsed_ms: 0,
        }
    }

    /// Donors newly notified by this dispatch.
    pub fn notified(&self) -> usize {
        self.count(DonorStatus::Notified)
    }

    /// Donors still in flight when the summary was taken.
    pub fn pending(&self) -> usize {
        self.count(DonorStatus::Pending)
    }

    /// Donors skipped because an earlier dispatch reached them.
    pub fn already_notified(&self) -> usize {
        self.count(DonorStatus::AlreadyNotified)
    }

    /// The outcome for `donor_id`.
    pub fn donor(&self, donor_id: UserId) -> Option<&DonorOutcome> {
        self.donors.iter().find(|d| d.donor_id == donor_id)
    }

    fn count(&self, status: DonorStatus) -> usize {
        self.donors.iter().filter(|d| d.status == status).count()
    }
}

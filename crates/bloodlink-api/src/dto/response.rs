//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::{DonationId, UserId};
use bloodlink_dispatch::DispatchSummary;
use bloodlink_entity::donation::DonationStatus;
use bloodlink_entity::notification::Notification;
use bloodlink_entity::request::BloodRequest;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Session minted after phone verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Bearer token.
    pub token: String,
    /// Token expiration.
    pub expires_at: DateTime<Utc>,
    /// User id derived from the phone number.
    pub user_id: UserId,
    /// Normalized phone number.
    pub phone_number: String,
}

/// A stored request and how its first dispatch went.
#[derive(Debug, Clone, Serialize)]
pub struct RequestCreatedResponse {
    /// The request as stored.
    pub request: BloodRequest,
    /// Per-donor dispatch results.
    pub dispatch: DispatchSummary,
}

/// Donation status after a confirmation or dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationStatusResponse {
    /// The donation.
    pub donation_id: DonationId,
    /// Its status now.
    pub status: DonationStatus,
}

/// A page of the caller's notifications.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationListResponse {
    /// Newest first.
    pub notifications: Vec<Notification>,
    /// Total unread for the caller.
    pub unread: u64,
}

/// Liveness report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// `hub` or `remote`.
    pub realtime: String,
    /// Open WebSocket connections on this process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_connections: Option<usize>,
}

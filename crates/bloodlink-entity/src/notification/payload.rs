//! Typed notification payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bloodlink_core::types::{DonationId, RequestId, UserId};

use crate::blood::{BloodType, Urgency};
use crate::donation::DonationStatus;

text_enum!(
    /// Notification category, derived from the payload variant.
    NotificationType {
        /// A donor is asked to help with a request.
        BloodRequest => "blood_request",
        /// A donation changed state.
        DonationUpdate => "donation_update",
        /// A chat message arrived.
        ChatMessage => "chat_message",
        /// Anything else.
        General => "general",
    }
);

/// Structured data attached to a notification, one shape per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Sent to each selected donor.
    BloodRequest {
        /// The request.
        request_id: RequestId,
        /// Patient blood group.
        blood_type: BloodType,
        /// Request urgency.
        urgency: Urgency,
        /// Hospital name.
        hospital: String,
        /// Distance from the donor to the hospital.
        distance_km: f64,
        /// Units still needed at dispatch time.
        units_needed: u32,
    },
    /// Sent to the other party when a donation moves.
    DonationUpdate {
        /// The donation.
        donation_id: DonationId,
        /// The request it serves.
        request_id: RequestId,
        /// Status after the change.
        status: DonationStatus,
    },
    /// Sent when a chat message arrives.
    ChatMessage {
        /// Conversation the message belongs to.
        conversation_id: Uuid,
        /// Author.
        sender_id: UserId,
        /// First characters of the message.
        preview: String,
    },
    /// Free-form notice.
    General {
        /// Optional deep link.
        link: Option<String>,
    },
}

impl NotificationPayload {
    /// The category for this payload.
    pub fn kind(&self) -> NotificationType {
        match self {
            Self::BloodRequest { .. } => NotificationType::BloodRequest,
            Self::DonationUpdate { .. } => NotificationType::DonationUpdate,
            Self::ChatMessage { .. } => NotificationType::ChatMessage,
            Self::General { .. } => NotificationType::General,
        }
    }

    /// The request this payload concerns, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::BloodRequest { request_id, .. } | Self::DonationUpdate { request_id, .. } => {
                Some(*request_id)
            }
            _ => None,
        }
    }
}

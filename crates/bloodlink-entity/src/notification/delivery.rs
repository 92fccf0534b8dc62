//! Per-channel delivery outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodlink_core::types::NotificationId;

text_enum!(
    /// External delivery channel.
    DeliveryChannel {
        /// Text message through the SMS provider.
        Sms => "sms",
        /// Event on the realtime room bus.
        Realtime => "realtime",
    }
);

/// How one channel send ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Accepted by a real provider.
    Delivered {
        /// Provider message id, when the channel returns one.
        provider_id: Option<String>,
    },
    /// Logged by the development fallback only.
    Simulated {
        /// Synthetic id.
        provider_id: String,
    },
    /// Rejected by the provider; retrying will not help.
    Failed {
        /// Provider error text.
        reason: String,
    },
    /// Transient failures until retries ran out.
    Exhausted {
        /// Last provider error text.
        reason: String,
    },
    /// Not attempted (channel disabled or no address).
    Skipped {
        /// Why the channel was skipped.
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Whether a message left (or would have left) the system.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Simulated { .. })
    }

    /// Stored status token.
    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Simulated { .. } => "simulated",
            Self::Failed { .. } => "failed",
            Self::Exhausted { .. } => "exhausted",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// The persisted result of one channel attempt for one notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// The notification this delivery belongs to.
    pub notification_id: NotificationId,
    /// Channel used.
    pub channel: DeliveryChannel,
    /// Final outcome.
    pub outcome: DeliveryOutcome,
    /// Provider calls made, including the first.
    pub attempts: u32,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

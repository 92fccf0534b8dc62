//! SMS provider trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a provider accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Handed to a real carrier.
    Delivered,
    /// No provider configured; the message was only logged.
    Simulated,
}

/// Successful send result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsReceipt {
    /// Provider message id, or a synthetic `dev-` id when simulated.
    pub id: String,
    /// Whether the message actually left the system.
    pub mode: DeliveryMode,
}

/// Provider failure, split by whether a retry could help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SmsError {
    /// Timeout, throttling or a 5xx-class provider error.
    #[error("transient SMS failure: {0}")]
    Transient(String),
    /// Invalid destination or rejected content.
    #[error("permanent SMS failure: {0}")]
    Permanent(String),
}

impl SmsError {
    /// Whether retrying the same send may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Outbound text message gateway.
#[async_trait]
pub trait SmsProvider: Send + Sync + 'static {
    /// Send `body` to the E.164 number `to`.
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError>;

    /// Short name used in logs and delivery records.
    fn name(&self) -> &'static str;
}

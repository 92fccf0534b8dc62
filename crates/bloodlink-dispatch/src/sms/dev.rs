//! Development SMS fallback.

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use bloodlink_core::traits::{DeliveryMode, SmsError, SmsProvider, SmsReceipt};

/// Logs every message instead of sending it.
///
/// Receipts carry a synthetic `dev-` id and [`DeliveryMode::Simulated`], so
/// callers can never mistake them for carrier deliveries.
#[derive(Debug, Default)]
pub struct DevSmsProvider;

impl DevSmsProvider {
    /// Create the fallback provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SmsProvider for DevSmsProvider {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let id = format!("dev-{}", Uuid::new_v4());
        warn!(to, body, id = %id, "Simulated SMS (no provider configured)");
        Ok(SmsReceipt {
            id,
            mode: DeliveryMode::Simulated,
        })
    }

    fn name(&self) -> &'static str {
        "development"
    }
}

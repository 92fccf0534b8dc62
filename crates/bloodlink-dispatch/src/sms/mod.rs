//! SMS providers and the factory that picks one from configuration.

pub mod dev;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use bloodlink_core::config::{Environment, SmsConfig, SmsProviderKind};
use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::SmsProvider;

pub use dev::DevSmsProvider;
pub use http::HttpSmsProvider;

/// Build the SMS provider described by `config`.
///
/// Without complete credentials the development fallback is used. In
/// production that is a configuration error unless
/// `sms.allow_development_fallback` is set.
pub fn build_sms_provider(
    config: &SmsConfig,
    environment: Environment,
    call_timeout: Duration,
) -> AppResult<Arc<dyn SmsProvider>> {
    if config.provider == SmsProviderKind::Http && config.has_credentials() {
        let provider = HttpSmsProvider::new(config, call_timeout)?;
        info!(base_url = %config.base_url, "SMS delivery through HTTP provider");
        return Ok(Arc::new(provider));
    }

    let reason = match config.provider {
        SmsProviderKind::Http => "sms.provider is http but credentials are incomplete",
        SmsProviderKind::Development => "sms.provider is development",
    };

    if environment.is_production() && !config.allow_development_fallback {
        return Err(AppError::configuration(format!(
            "{reason}; refusing simulated SMS in production \
             (set sms.allow_development_fallback to override)"
        )));
    }

    warn!(
        reason,
        production = environment.is_production(),
        "SMS delivery is SIMULATED: messages are logged, not sent"
    );
    Ok(Arc::new(DevSmsProvider::new()))
}

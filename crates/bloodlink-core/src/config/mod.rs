//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field has a default so an empty file is a valid
//! development configuration.

pub mod app;
pub mod auth;
pub mod database;
pub mod dispatch;
pub mod logging;
pub mod matching;
pub mod realtime;
pub mod sms;

use serde::{Deserialize, Serialize};

pub use self::app::{Environment, ServerConfig};
pub use self::auth::{AuthConfig, RateLimitRule, RateLimitsConfig, VerificationConfig};
pub use self::database::{DatabaseConfig, DatabaseProvider};
pub use self::dispatch::{DispatchConfig, RetryConfig};
pub use self::logging::LoggingConfig;
pub use self::matching::MatchingConfig;
pub use self::realtime::{RealtimeConfig, ReconnectPolicy, RemoteLinkConfig};
pub use self::sms::{SmsConfig, SmsProviderKind};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Persistence backend settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Phone authentication, verification code and rate limit settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Donor selection settings.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Notification fan-out settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// SMS provider settings.
    #[serde(default)]
    pub sms: SmsConfig,
    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `BLOODLINK__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BLOODLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject combinations that would silently misbehave at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        self.matching.validate()?;
        self.dispatch.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

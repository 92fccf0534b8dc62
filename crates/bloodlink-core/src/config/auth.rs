//! Phone authentication configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for session JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Session token TTL in minutes.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,
    /// Verification code settings.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Per-scope rate limits.
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

impl AuthConfig {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if !(4..=10).contains(&self.verification.code_length) {
            return Err(AppError::configuration(
                "auth.verification.code_length must be between 4 and 10",
            ));
        }
        for (name, rule) in [
            ("auth_attempt", &self.rate_limits.auth_attempt),
            ("code_issuance", &self.rate_limits.code_issuance),
        ] {
            if rule.max_attempts == 0 || rule.window_seconds == 0 {
                return Err(AppError::configuration(format!(
                    "auth.rate_limits.{name} needs a non-zero limit and window"
                )));
            }
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            session_ttl_minutes: default_session_ttl(),
            verification: VerificationConfig::default(),
            rate_limits: RateLimitsConfig::default(),
        }
    }
}

/// Verification code issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Number of digits in an issued code.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Time-to-live of an issued code, in seconds.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: u64,
}

impl VerificationConfig {
    /// Code TTL as a duration.
    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_seconds)
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            code_ttl_seconds: default_code_ttl(),
        }
    }
}

/// A fixed maximum number of attempts inside a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Attempts allowed per window.
    pub max_attempts: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl RateLimitRule {
    /// Window length as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Rate limits per scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    /// Verification attempts per phone number.
    #[serde(default = "default_auth_attempt")]
    pub auth_attempt: RateLimitRule,
    /// Code issuances per phone number.
    #[serde(default = "default_code_issuance")]
    pub code_issuance: RateLimitRule,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            auth_attempt: default_auth_attempt(),
            code_issuance: default_code_issuance(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_session_ttl() -> u64 {
    60 * 24
}

fn default_code_length() -> usize {
    6
}

fn default_code_ttl() -> u64 {
    600
}

fn default_auth_attempt() -> RateLimitRule {
    RateLimitRule {
        max_attempts: 5,
        window_seconds: 15 * 60,
    }
}

fn default_code_issuance() -> RateLimitRule {
    RateLimitRule {
        max_attempts: 3,
        window_seconds: 60 * 60,
    }
}

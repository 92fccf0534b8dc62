//! Notification fan-out configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Dispatch worker pool and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum donors being delivered to at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Overall budget for one dispatch, in milliseconds.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_ms: u64,
    /// Budget for a single provider call, in milliseconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
    /// Retry policy for transient provider failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl DispatchConfig {
    /// Overall dispatch timeout.
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Per provider call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::configuration("dispatch.concurrency must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::configuration(
                "dispatch.retry.max_attempts must be > 0",
            ));
        }
        if self.call_timeout_ms > self.dispatch_timeout_ms {
            return Err(AppError::configuration(
                "dispatch.call_timeout_ms must not exceed dispatch.dispatch_timeout_ms",
            ));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            dispatch_timeout_ms: default_dispatch_timeout(),
            call_timeout_ms: default_call_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per channel send, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_backoff_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}

fn default_dispatch_timeout() -> u64 {
    30_000
}

fn default_call_timeout() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    2_000
}

//! Sliding-window rate limiter keyed by identity and scope.
//!
//! Each (key, scope) pair keeps a log of attempt timestamps inside the
//! current window. State lives in a `DashMap`, so only the shard holding a
//! key is locked while it is checked.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use bloodlink_core::config::{RateLimitRule, RateLimitsConfig};
use bloodlink_core::error::AppError;
use bloodlink_core::traits::Clock;

/// What is being limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    /// Verification attempts.
    AuthAttempt,
    /// Verification code issuance.
    CodeIssuance,
}

impl RateScope {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthAttempt => "auth_attempt",
            Self::CodeIssuance => "code_issuance",
        }
    }
}

/// Result of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The attempt was counted and may proceed.
    Allowed,
    /// Over the limit; the oldest counted attempt leaves the window after
    /// the given delay.
    Denied(Duration),
}

impl RateDecision {
    /// Convert a denial into a `RateLimited` error.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(retry_after) => Err(AppError::rate_limited(retry_after)),
        }
    }
}

/// Per-(key, scope) sliding window log.
pub struct RateLimiter {
    windows: DashMap<(String, RateScope), VecDeque<DateTime<Utc>>>,
    rules: RateLimitsConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked", &self.windows.len())
            .field("rules", &self.rules)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter with the configured rules.
    pub fn new(rules: RateLimitsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            rules,
            clock,
        }
    }

    fn rule(&self, scope: RateScope) -> RateLimitRule {
        match scope {
            RateScope::AuthAttempt => self.rules.auth_attempt,
            RateScope::CodeIssuance => self.rules.code_issuance,
        }
    }

    /// Count an attempt for `key` in `scope`, or deny it.
    ///
    /// Denied attempts are not counted.
    pub fn check(&self, key: &str, scope: RateScope) -> RateDecision {
        let rule = self.rule(scope);
        let window = chrono::Duration::seconds(rule.window_seconds as i64);
        let now = self.clock.now();

        let mut log = self.windows.entry((key.to_string(), scope)).or_default();
        while log.front().is_some_and(|t| *t + window <= now) {
            log.pop_front();
        }

        if log.len() < rule.max_attempts as usize {
            log.push_back(now);
            return RateDecision::Allowed;
        }

        let retry_after = log
            .front()
            .map(|oldest| (*oldest + window - now).to_std().unwrap_or_default())
            .unwrap_or_else(|| rule.window());
        debug!(
            scope = scope.as_str(),
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );
        RateDecision::Denied(retry_after)
    }

    /// Give back the newest counted attempt for `key` in `scope`.
    pub fn release(&self, key: &str, scope: RateScope) {
        if let Some(mut log) = self.windows.get_mut(&(key.to_string(), scope)) {
            log.pop_back();
        }
    }

    /// Forget every attempt for `key` in `scope`.
    pub fn reset(&self, key: &str, scope: RateScope) {
        self.windows.remove(&(key.to_string(), scope));
    }

    /// Drop windows whose attempts have all aged out. Returns how many.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|(_, scope), log| {
            let window = chrono::Duration::seconds(self.rule(*scope).window_seconds as i64);
            log.back().is_some_and(|newest| *newest + window > now)
        });
        before.saturating_sub(self.windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_core::traits::ManualClock;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let rules = RateLimitsConfig {
            auth_attempt: RateLimitRule {
                max_attempts: 3,
                window_seconds: 60,
            },
            code_issuance: RateLimitRule {
                max_attempts: 1,
                window_seconds: 3600,
            },
        };
        (RateLimiter::new(rules, clock.clone()), clock)
    }

    #[test]
    fn test_denies_after_limit_within_window() {
        let (limiter, _) = limiter();
        for _ in 0..3 {
            assert_eq!(limiter.check("+22236000001", RateScope::AuthAttempt), RateDecision::Allowed);
        }
        assert!(matches!(
            limiter.check("+22236000001", RateScope::AuthAttempt),
            RateDecision::Denied(_)
        ));
    }

    #[test]
    fn test_keys_and_scopes_are_independent() {
        let (limiter, _) = limiter();
        assert_eq!(limiter.check("a", RateScope::CodeIssuance), RateDecision::Allowed);
        assert!(matches!(limiter.check("a", RateScope::CodeIssuance), RateDecision::Denied(_)));
        assert_eq!(limiter.check("b", RateScope::CodeIssuance), RateDecision::Allowed);
        assert_eq!(limiter.check("a", RateScope::AuthAttempt), RateDecision::Allowed);
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = limiter();
        for _ in 0..3 {
            limiter.check("k", RateScope::AuthAttempt);
        }
        clock.advance(chrono::Duration::seconds(20));
        match limiter.check("k", RateScope::AuthAttempt) {
            RateDecision::Denied(after) => assert_eq!(after, Duration::from_secs(40)),
            RateDecision::Allowed => panic!("expected denial"),
        }
        clock.advance(chrono::Duration::seconds(40));
        assert_eq!(limiter.check("k", RateScope::AuthAttempt), RateDecision::Allowed);
    }

    #[test]
    fn test_release_refunds_one_attempt() {
        let (limiter, _) = limiter();
        assert_eq!(limiter.check("k", RateScope::CodeIssuance), RateDecision::Allowed);
        limiter.release("k", RateScope::CodeIssuance);
        assert_eq!(limiter.check("k", RateScope::CodeIssuance), RateDecision::Allowed);
        assert!(matches!(limiter.check("k", RateScope::CodeIssuance), RateDecision::Denied(_)));
    }

    #[test]
    fn test_prune_drops_idle_windows() {
        let (limiter, clock) = limiter();
        limiter.check("k", RateScope::AuthAttempt);
        limiter.check("other", RateScope::CodeIssuance);
        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(limiter.prune(), 1);
    }

    #[test]
    fn test_denial_converts_to_rate_limited_error() {
        let err = RateDecision::Denied(Duration::from_secs(12))
            .into_result()
            .unwrap_err();
        assert_eq!(err.retry_after, Some(Duration::from_secs(12)));
    }
}

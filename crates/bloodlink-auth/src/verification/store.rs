//! Time-boxed, single-use verification code issuer and validator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bloodlink_core::config::{DispatchConfig, Environment, RetryConfig, VerificationConfig};
use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, DeliveryMode, SmsProvider};
use bloodlink_database::VerificationCodeRepository;
use bloodlink_dispatch::DeliveryError;
use bloodlink_dispatch::retry::send_with_retry;
use bloodlink_entity::verification::VerificationCode;

use super::code::{constant_time_eq, generate_code, hash_code};
use crate::phone::normalize_phone;
use crate::rate_limit::{RateLimiter, RateScope};

/// What the caller learns about an issued code. Never the code itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueReceipt {
    /// Normalized phone number the code was sent to.
    pub phone_number: String,
    /// When the code stops working.
    pub expires_at: DateTime<Utc>,
    /// Whether the SMS really left the system.
    pub delivery: DeliveryMode,
}

/// Proof that a phone number was verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneClaim {
    /// Normalized phone number.
    pub phone_number: String,
    /// When the code was redeemed.
    pub verified_at: DateTime<Utc>,
}

/// Issues and redeems phone verification codes.
pub struct VerificationCodeStore {
    repo: Arc<dyn VerificationCodeRepository>,
    limiter: Arc<RateLimiter>,
    sms: Arc<dyn SmsProvider>,
    clock: Arc<dyn Clock>,
    config: VerificationConfig,
    environment: Environment,
    retry: RetryConfig,
    call_timeout: Duration,
    generate: fn(usize) -> String,
}

impl std::fmt::Debug for VerificationCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationCodeStore")
            .field("sms", &self.sms.name())
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl VerificationCodeStore {
    /// Create a store. SMS sends follow the dispatch retry policy.
    pub fn new(
        repo: Arc<dyn VerificationCodeRepository>,
        limiter: Arc<RateLimiter>,
        sms: Arc<dyn SmsProvider>,
        clock: Arc<dyn Clock>,
        config: VerificationConfig,
        environment: Environment,
        dispatch: &DispatchConfig,
    ) -> Self {
        Self {
            repo,
            limiter,
            sms,
            clock,
            config,
            environment,
            retry: dispatch.retry.clone(),
            call_timeout: dispatch.call_timeout(),
            generate: generate_code,
        }
    }

    /// Replace the random code generator.
    pub fn with_code_generator(mut self, generate: fn(usize) -> String) -> Self {
        self.generate = generate;
        self
    }

    /// Issue a fresh code for `phone`, replacing any earlier one, and text it.
    ///
    /// Transient SMS failures are retried. When the send still fails, the
    /// previous live code is put back and the issuance is not counted
    /// against the rate limit.
    pub async fn issue(&self, phone: &str) -> AppResult<IssueReceipt> {
        let phone = normalize_phone(phone)?;
        self.limiter
            .check(&phone, RateScope::CodeIssuance)
            .into_result()?;

        let now = self.clock.now();
        let code = (self.generate)(self.config.code_length);
        let ttl = chrono::Duration::seconds(self.config.code_ttl_seconds as i64);
        let record = VerificationCode {
            phone_number: phone.clone(),
            code_hash: hash_code(&phone, &code),
            expires_at: now + ttl,
            verified: false,
            created_at: now,
        };
        let previous = self.repo.find_live(&phone, now).await?;
        self.repo.replace(&record).await?;

        if !self.environment.is_production() {
            info!(phone = %phone, code = %code, "Issued verification code");
        }

        let body = format!(
            "Your BloodLink verification code is {code}. It expires in {} minutes.",
            self.config.code_ttl_seconds.div_ceil(60)
        );
        let sms = &self.sms;
        let (to, text) = (phone.as_str(), body.as_str());
        let attempted = send_with_retry(&self.retry, self.call_timeout, "sms", move || async move {
            sms.send(to, text).await.map_err(DeliveryError::from)
        })
        .await;

        let receipt = match attempted.result {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    phone = %phone,
                    attempts = attempted.attempts,
                    error = %e,
                    "Failed to send verification code"
                );
                self.limiter.release(&phone, RateScope::CodeIssuance);
                if let Some(previous) = previous {
                    self.repo.replace(&previous).await?;
                }
                return Err(AppError::external_service(format!(
                    "Could not send verification SMS: {}",
                    e.reason()
                )));
            }
        };

        Ok(IssueReceipt {
            phone_number: phone,
            expires_at: record.expires_at,
            delivery: receipt.mode,
        })
    }

    /// Redeem `code` for `phone`.
    ///
    /// Every failure other than a malformed phone or a rate limit returns the
    /// same `InvalidOrExpiredCode` error.
    pub async fn verify(&self, phone: &str, code: &str) -> AppResult<PhoneClaim> {
        let phone = normalize_phone(phone)?;
        self.limiter
            .check(&phone, RateScope::AuthAttempt)
            .into_result()?;

        let now = self.clock.now();
        let code = code.trim();
        let Some(record) = self.repo.find_live(&phone, now).await? else {
            return Err(AppError::invalid_or_expired_code());
        };

        let presented = hash_code(&phone, code);
        let matches = constant_time_eq(presented.as_bytes(), record.code_hash.as_bytes());
        if !matches || !record.is_redeemable(now) {
            return Err(AppError::invalid_or_expired_code());
        }

        if !self.repo.mark_verified(&phone, &presented, now).await? {
            return Err(AppError::invalid_or_expired_code());
        }

        self.limiter.reset(&phone, RateScope::AuthAttempt);
        info!(phone = %phone, "Phone number verified");
        Ok(PhoneClaim {
            phone_number: phone,
            verified_at: now,
        })
    }

    /// Remove expired and consumed codes.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.repo.purge_expired(self.clock.now()).await
    }
}

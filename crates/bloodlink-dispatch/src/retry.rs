//! Bounded retry around a single channel send.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use bloodlink_core::config::RetryConfig;

use crate::error::DeliveryError;

/// Result of a retried send, with the number of calls made.
#[derive(Debug)]
pub struct Attempted<T> {
    /// Final result.
    pub result: Result<T, DeliveryError>,
    /// Calls made, including the first.
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or `policy.max_attempts`
/// calls have failed transiently. Each call is cut off after
/// `call_timeout`; a timeout counts as a transient failure.
pub async fn send_with_retry<T, F, Fut>(
    policy: &RetryConfig,
    call_timeout: Duration,
    label: &str,
    mut op: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeliveryError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(call_timeout, op()).await {
            Ok(Ok(value)) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Ok(Err(err @ DeliveryError::Permanent(_))) => {
                warn!(channel = label, attempt, error = %err, "Delivery rejected");
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                };
            }
            Ok(Err(err)) => err,
            Err(_) => DeliveryError::Transient(format!(
                "no response within {}ms",
                call_timeout.as_millis()
            )),
        };

        if attempt >= max_attempts {
            warn!(channel = label, attempt, error = %error, "Delivery retries exhausted");
            return Attempted {
                result: Err(error),
                attempts: attempt,
            };
        }

        let delay = policy.backoff_for(attempt);
        debug!(
            channel = label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient delivery failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 1_000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let out = send_with_retry(&policy(), Duration::from_secs(1), "sms", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(DeliveryError::Transient("503".into()))
                } else {
                    Ok("SM1")
                }
            }
        })
        .await;

        assert_eq!(out.result.unwrap(), "SM1");
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let out: Attempted<()> = send_with_retry(&policy(), Duration::from_secs(1), "sms", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(DeliveryError::Permanent("invalid number".into())) }
        })
        .await;

        assert_eq!(out.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!out.result.unwrap_err().is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_attempts() {
        let out: Attempted<()> =
            send_with_retry(&policy(), Duration::from_millis(50), "realtime", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert_eq!(out.attempts, 3);
        let err = out.result.unwrap_err();
        assert!(err.is_transient());
        assert!(err.reason().contains("50ms"));
    }
}

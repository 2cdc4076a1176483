//! Retry with exponential back-off and jitter for AI provider calls.
//!
//! Only transient failures are retried: timeouts, connection errors, 5xx
//! responses and 429 throttling. Everything else is returned on the first
//! failure.

use std::future::Future;
use std::time::Duration;

use chronicle_core::config::MAX_TRANSPORT_RETRIES;

use crate::error::AiError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
pub(crate) fn is_retriable(err: &AiError) -> bool {
    match err {
        AiError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        AiError::Api { status, .. } => *status == 429 || (500..600).contains(status),
        _ => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors. `max_retries` is clamped to [`MAX_TRANSPORT_RETRIES`].
///
/// The delay before retry *n* is `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`, capped at
/// 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let max_retries = max_retries.min(MAX_TRANSPORT_RETRIES);
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "AI provider transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn api(status: u16) -> AiError {
        AiError::Api {
            status,
            message: "rate limited".to_owned(),
        }
    }

    #[test]
    fn contract_violations_are_not_retriable() {
        assert!(!is_retriable(&AiError::NoFunctionCall {
            status: "completed".to_owned(),
            reason: "no tool call".to_owned(),
        }));
        assert!(!is_retriable(&AiError::RunTimedOut { waited_secs: 5 }));
        assert!(is_retriable(&api(429)));
        assert!(!is_retriable(&api(404)));
    }

    #[tokio::test]
    async fn throttled_call_is_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(api(429))
                } else {
                    Ok("run_1")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "run_1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(api(503))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

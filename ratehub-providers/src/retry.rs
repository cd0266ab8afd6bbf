//! Bounded-backoff retry shared by the HTTP providers.

use std::future::Future;
use std::time::Duration;

use ratehub_types::ProviderError;

/// Retries after the first and second failure, so three attempts total.
const MAX_RETRIES: u32 = 2;

/// Delay before the first retry; doubles each time (1s, then 2s).
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Runs `attempt` up to three times. Transport and API failures are
/// retried alike.
pub(crate) async fn with_retry<T, F, Fut>(
    provider: &str,
    mut attempt: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut retries_left = MAX_RETRIES;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if retries_left > 0 => {
                tracing::warn!(
                    provider,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    retries_left,
                    "provider request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                retries_left -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Http("connection reset".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Timeout) }
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

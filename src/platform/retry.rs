// Retry wrapper for Discord REST calls that come back 429.
//
// Discord tells us how long to wait (`retry_after`, seconds). We honor it,
// capped at MAX_BACKOFF, and fall back to exponential backoff when the
// response didn't say. Any other error is returned immediately.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Maximum number of retries after the first attempt.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff when no retry_after is given.
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on any single wait.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A 429 from Discord. Carried inside anyhow::Error so `with_retry` can find it.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimited {
    pub retry_after: Option<Duration>,
}

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retry_after {
            Some(d) => write!(f, "rate limited (429), retry after {:.1}s", d.as_secs_f64()),
            None => write!(f, "rate limited (429)"),
        }
    }
}

impl std::error::Error for RateLimited {}

/// How long to wait before retry number `attempt` (1-based), or None if the
/// error isn't a rate limit.
fn retry_delay(err: &anyhow::Error, attempt: u32) -> Option<Duration> {
    let limited = err.downcast_ref::<RateLimited>()?;
    let delay = limited
        .retry_after
        .unwrap_or_else(|| BASE_BACKOFF.saturating_mul(1u32 << attempt.min(16)));
    Some(delay.min(MAX_BACKOFF))
}

/// Run `operation`, retrying on RateLimited errors up to MAX_RETRIES times.
pub async fn with_retry<F, Fut, T>(operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= MAX_RETRIES {
                    return Err(err);
                }
                let Some(delay) = retry_delay(&err, attempt + 1) else {
                    return Err(err);
                };
                attempt += 1;

                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    backoff_secs = delay.as_secs_f64(),
                    "Discord rate limited, retrying in {:.1}s",
                    delay.as_secs_f64(),
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn limited(secs: Option<f64>) -> anyhow::Error {
        anyhow::Error::new(RateLimited {
            retry_after: secs.map(Duration::from_secs_f64),
        })
    }

    #[test]
    fn test_retry_delay_uses_retry_after() {
        let d = retry_delay(&limited(Some(2.5)), 1).unwrap();
        assert_eq!(d, Duration::from_secs_f64(2.5));
    }

    #[test]
    fn test_retry_delay_capped() {
        let d = retry_delay(&limited(Some(600.0)), 1).unwrap();
        assert_eq!(d, MAX_BACKOFF);
    }

    #[test]
    fn test_retry_delay_falls_back_to_exponential() {
        assert_eq!(retry_delay(&limited(None), 1).unwrap(), Duration::from_secs(2));
        assert_eq!(retry_delay(&limited(None), 2).unwrap(), Duration::from_secs(4));
    }

    #[test]
    fn test_other_errors_not_retried() {
        assert!(retry_delay(&anyhow::anyhow!("403 Missing Permissions"), 1).is_none());
    }

    #[test]
    fn test_rate_limited_survives_context() {
        use anyhow::Context;
        let err: Result<()> = Err(limited(Some(1.0)));
        let err = err.context("ban failed").unwrap_err();
        assert!(retry_delay(&err, 1).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_after_rate_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(|| {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(limited(Some(1.0)))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<()> = with_retry(|| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(limited(Some(1.0)))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_returns_non_rate_limit_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<()> = with_retry(|| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("404 Unknown Member"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Bounded retry with exponential backoff and a per-attempt timeout.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::RateLimiter;

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable: Sized {
    /// Transient failures (rate limiting, server errors, timeouts, transport).
    fn is_retryable(&self) -> bool;

    /// The error reported when an attempt exceeds the policy's timeout.
    fn timed_out(after: Duration) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on a single attempt. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            timeout: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (1-based): base, 2x base, 4x base, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (retry - 1).min(16);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently or attempts run out.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_limited(label, None, op).await
    }

    /// Like [`run`](Self::run) but waits on `limiter` before every attempt.
    pub async fn run_limited<T, E, F, Fut>(
        &self,
        label: &str,
        limiter: Option<&RateLimiter>,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if let Some(limiter) = limiter {
                limiter.acquire().await;
            }

            let outcome = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(E::timed_out(limit)),
                },
                None => op().await,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{} failed with retryable error (attempt {}/{}), retrying in {}ms: {}",
                        label,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

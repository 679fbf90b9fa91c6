//! Throttling and retry shared by the search and language-model clients.

pub mod rate_limit;
pub mod retry;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, Retryable};

/// A rate limiter paired with a retry policy. Every attempt, retries
/// included, waits on the limiter before it is dispatched.
#[derive(Debug, Clone)]
pub struct CallGuard {
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl CallGuard {
    pub fn new(limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self { limiter, retry }
    }

    /// A guard with no throttling and a single attempt.
    pub fn passthrough() -> Self {
        Self::new(Arc::new(RateLimiter::unlimited()), RetryPolicy::no_retry())
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.retry
            .run_limited(label, Some(self.limiter.as_ref()), op)
            .await
    }
}

//! Bounded exponential backoff for transient generator failures.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry::RetryIf;
use tracing::warn;

use super::GenerationError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay slept before retry `n` (0-based): base, 2·base, 4·base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }

    /// Only the first `max_attempts - 1` delays are ever slept.
    fn schedule(&self) -> impl Iterator<Item = Duration> {
        let policy = *self;
        (0..self.max_attempts.max(1) - 1).map(move |n| policy.delay_for(n))
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the attempt
    /// budget is spent. Each attempt is bounded by `attempt_timeout`.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let attempts = AtomicU32::new(0);
        let timeout = self.attempt_timeout;

        let result = RetryIf::spawn(
            self.schedule(),
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                let attempt = op();
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(GenerationError::Transient(format!(
                            "attempt timed out after {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            },
            |e: &GenerationError| {
                let retry = e.is_transient();
                if retry {
                    warn!(
                        attempt = attempts.load(Ordering::Relaxed),
                        error = %e,
                        "Transient generator failure, backing off"
                    );
                }
                retry
            },
        )
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_transient() => Err(GenerationError::RetriesExhausted {
                attempts: attempts.load(Ordering::Relaxed),
                last: Box::new(e),
            }),
            Err(e) => Err(e),
        }
    }
}

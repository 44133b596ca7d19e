//! Fixed-delay retry policy
//!
//! Used by every fetch site: a bounded number of attempts, a constant pause
//! between them, and a caller-supplied predicate deciding which errors are
//! worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry settings for one kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Pause before each new attempt
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// A non-retryable error; surfaced on the attempt that produced it
    Fatal(E),
    /// Every attempt failed with a retryable error
    Exhausted { last: E, attempts: u32 },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails fatally, or runs out of attempts
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, RetryFailure<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !retryable(&e) => return Err(RetryFailure::Fatal(e)),
                Err(e) if attempt >= max_attempts => {
                    return Err(RetryFailure::Exhausted {
                        last: e,
                        attempts: attempt,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        "{}. Retrying in {:?}... (attempt {}/{})",
                        e,
                        self.delay,
                        attempt,
                        max_attempts
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

//! Bounded retry with exponential back-off and jitter.
//!
//! [`RetryPolicy::run`] drives any fallible async operation. The operation
//! receives the zero-based attempt index so callers can rotate through
//! alternatives (mirrors, models) instead of repeating the same call. A
//! classifier decides whether an error is worth another attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Stop,
}

/// Every error seen, in attempt order, when the policy gives up.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub errors: Vec<E>,
}

impl<E> RetryFailure<E> {
    #[must_use]
    pub fn last(&self) -> Option<&E> {
        self.errors.last()
    }

    #[must_use]
    pub fn into_last(self) -> Option<E> {
        self.errors.into_iter().last()
    }
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s)", self.errors.len())?;
        if let Some(last) = self.errors.last() {
            write!(f, ": {last}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay: the wait before retry `n` is `backoff_base_ms * 2^(n-1)`.
    pub backoff_base_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_base_ms,
            ..Self::default()
        }
    }

    /// A policy that moves straight to the next attempt without sleeping.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 0)
    }

    /// Jittered delay (±25 %) before retry number `retry` (1-based), capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.backoff_base_ms == 0 || retry == 0 {
            return Duration::ZERO;
        }
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << (retry - 1).min(10));
        let capped = computed.min(self.max_delay_ms);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(jittered)
    }

    /// Runs `operation` until it succeeds, `classify` says stop, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns [`RetryFailure`] carrying the error of every attempt made.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut errors = Vec::new();
        for attempt in 0..max_attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let decision = classify(&err);
                    let exhausted = attempt + 1 >= max_attempts;
                    if decision == RetryDecision::Stop || exhausted {
                        errors.push(err);
                        break;
                    }
                    let delay = self.delay_for(attempt + 1);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );
                    errors.push(err);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(RetryFailure { errors })
    }
}

//! Rotation across alternate front-ends serving the same source.
//!
//! A [`MirrorRouter`] belongs to exactly one adapter instance. Each routed
//! operation starts at the current mirror; every failure advances the
//! pointer and the same operation is retried on the next mirror, for at most
//! one pass over the list.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use painradar_core::{RetryDecision, RetryPolicy};

use crate::error::AcquireError;

/// Outcome of a routed operation: the value, if any mirror produced one, and
/// one message per mirror that failed along the way.
#[derive(Debug)]
pub struct Routed<T> {
    pub value: Option<T>,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct MirrorRouter {
    mirrors: Vec<String>,
    current: AtomicUsize,
    backoff_ms: u64,
}

impl MirrorRouter {
    #[must_use]
    pub fn new(mirrors: Vec<String>) -> Self {
        Self {
            mirrors: mirrors
                .into_iter()
                .map(|m| m.trim_end_matches('/').to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            current: AtomicUsize::new(0),
            backoff_ms: 0,
        }
    }

    /// Sleep between mirror attempts, grown exponentially by the retry policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    #[must_use]
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        let n = self.mirrors.len();
        if n == 0 {
            return None;
        }
        self.mirrors
            .get(self.current.load(Ordering::Relaxed) % n)
            .map(String::as_str)
    }

    /// Moves past `failed` unless another operation already did.
    fn advance_from(&self, failed: usize) {
        let n = self.mirrors.len();
        if n == 0 {
            return;
        }
        let _ = self.current.compare_exchange(
            failed,
            (failed + 1) % n,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    /// Runs `operation` against successive mirrors until one succeeds.
    ///
    /// `operation` receives the mirror base URL. Any error counts as a failure
    /// signature for that mirror.
    pub async fn route<T, F, Fut>(&self, mut operation: F) -> Routed<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, AcquireError>>,
    {
        let n = self.mirrors.len();
        if n == 0 {
            return Routed {
                value: None,
                errors: vec!["no mirrors configured".to_string()],
            };
        }

        let start = self.current.load(Ordering::Relaxed) % n;
        let failures: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let policy = RetryPolicy {
            max_attempts: u32::try_from(n).unwrap_or(u32::MAX),
            backoff_base_ms: self.backoff_ms,
            ..RetryPolicy::default()
        };

        let outcome = policy
            .run(
                |attempt| {
                    let idx = (start + attempt as usize) % n;
                    let mirror = self.mirrors[idx].clone();
                    let fut = operation(mirror.clone());
                    let failures = &failures;
                    async move {
                        match fut.await {
                            Ok(value) => Ok(value),
                            Err(err) => {
                                tracing::warn!(mirror = %mirror, error = %err, "mirror failed");
                                failures
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push(format!("{mirror}: {err}"));
                                self.advance_from(idx);
                                Err(err)
                            }
                        }
                    }
                },
                |_| RetryDecision::Retry,
            )
            .await;

        let errors = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        Routed {
            value: outcome.ok(),
            errors,
        }
    }
}

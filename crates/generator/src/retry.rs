//! Retry with exponential backoff for storage calls
//!
//! Only transient failures (lost connections, pool exhaustion) are retried.

use crate::errors::GeneratorError;
use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use quizforge_common::config::RetryConfig;
use quizforge_common::metrics::record_retry;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff settings for retried storage operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    initial_interval: Duration,
    max_interval: Duration,
    max_elapsed: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_interval: config.initial_interval(),
            max_interval: config.max_interval(),
            max_elapsed: config.max_elapsed(),
            multiplier: config.multiplier,
        }
    }

    /// Policy that gives up on the first failure
    pub fn disabled() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            max_elapsed: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        }
    }

    /// Run `operation`, retrying while it fails transiently and the elapsed
    /// budget allows
    pub async fn run<T, F, Fut>(&self, label: &'static str, mut operation: F) -> Result<T, GeneratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GeneratorError>>,
    {
        retry_notify(
            self.backoff(),
            || {
                let attempt = operation();
                async move {
                    attempt.await.map_err(|e| {
                        if e.is_transient() {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: GeneratorError, wait: Duration| {
                warn!(
                    operation = label,
                    error = %e,
                    retry_in_ms = wait.as_millis() as u64,
                    "Transient storage failure, retrying"
                );
                record_retry(label);
            },
        )
        .await
    }
}

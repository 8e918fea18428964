//! Retry for record store calls.
//!
//! The record service caps requests per base and answers 429 with a
//! `Retry-After` when the cap is hit; that wait is honoured as given, up to
//! `max_delay`. Server errors and connection or timeout failures back off
//! from `base_delay`, doubling per retry. Anything else (missing record,
//! bad field, bad key) goes straight back to the caller.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RecordError, RecordResult};
use crate::metrics::record_retry;

/// How often and how long to wait before repeating a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Read `RECORDS_RETRY_MAX`, `RECORDS_RETRY_BASE_MS` and
    /// `RECORDS_RETRY_MAX_MS`, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        Self {
            max_retries: std::env::var("RECORDS_RETRY_MAX")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay: millis("RECORDS_RETRY_BASE_MS").unwrap_or(defaults.base_delay),
            max_delay: millis("RECORDS_RETRY_MAX_MS").unwrap_or(defaults.max_delay),
        }
    }

    /// Wait before retry number `retry` (1-based) after `error`, or `None`
    /// when the call must not be repeated.
    pub fn delay_for(&self, error: &RecordError, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let delay = match error {
            RecordError::RateLimited(after_ms) => Duration::from_millis(*after_ms),
            RecordError::Server { .. } => self.backoff(retry),
            RecordError::Network(e) if e.is_timeout() || e.is_connect() => self.backoff(retry),
            _ => return None,
        };
        Some(delay.min(self.max_delay))
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    /// Run `op` until it succeeds or `delay_for` says to stop.
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> RecordResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RecordResult<T>>,
    {
        let mut retry = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            retry += 1;
            let Some(delay) = self.delay_for(&err, retry) else {
                return Err(err);
            };

            warn!(
                operation = %operation,
                retry,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Record store call failed, retrying"
            );
            record_retry(operation);
            tokio::time::sleep(delay).await;
        }
    }
}

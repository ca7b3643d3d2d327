//! Bounded retry for cache operations
//!
//! Counter operations are retried on transient failures with exponential
//! backoff plus a small deterministic jitter. Once the attempts are used up
//! the last error is returned to the caller, which treats it as fatal for
//! the request.
//!
//! `get`, `set` and `flush_and_restore` are idempotent and retry any
//! transient failure. `increment` and `decrement` retry only when the
//! connection could not be made: a command that timed out may have been
//! applied, and sending it again would count the write twice.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CacheError, EntryCountCache};

/// Retry settings for cache round-trips
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff(&self, operation: &str, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let baseline = self
            .base_delay_ms
            .saturating_mul(1 << exponent)
            .min(self.max_delay_ms);

        let jitter_bound = baseline / 4;
        let jitter = if jitter_bound == 0 {
            0
        } else {
            let seed = format!("{}:{}", operation, attempt);
            let hash = blake3::hash(seed.as_bytes());
            let bytes = hash.as_bytes();
            u64::from(u16::from_be_bytes([bytes[0], bytes[1]])) % (jitter_bound + 1)
        };

        Duration::from_millis((baseline + jitter).min(self.max_delay_ms))
    }
}

/// Entry counter that retries transient failures of the wrapped counter
pub struct RetryingEntryCount<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: EntryCountCache> RetryingEntryCount<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn retry<T>(
        &self,
        operation: &'static str,
        retryable: fn(&CacheError) -> bool,
        mut f: impl FnMut(&C) -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        let mut attempt = 1;
        loop {
            match f(&self.inner) {
                Ok(value) => return Ok(value),
                Err(e) if retryable(&e) && self.policy.should_retry(attempt) => {
                    let delay = self.policy.backoff(operation, attempt);
                    warn!(
                        "Cache {} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation, attempt, self.policy.max_attempts, delay, e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!("Cache {} failed after {} attempts: {}", operation, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl<C: EntryCountCache> EntryCountCache for RetryingEntryCount<C> {
    fn get(&self) -> Result<i64, CacheError> {
        self.retry("get", CacheError::is_transient, |c| c.get())
    }

    fn set(&self, count: i64) -> Result<(), CacheError> {
        self.retry("set", CacheError::is_transient, |c| c.set(count))
    }

    fn increment(&self) -> Result<(), CacheError> {
        self.retry("increment", CacheError::is_unsent, |c| c.increment())
    }

    fn decrement(&self) -> Result<(), CacheError> {
        self.retry("decrement", CacheError::is_unsent, |c| c.decrement())
    }

    fn flush_and_restore(&self, count: i64) -> Result<(), CacheError> {
        self.retry("flush_and_restore", CacheError::is_transient, |c| {
            c.flush_and_restore(count)
        })
    }
}

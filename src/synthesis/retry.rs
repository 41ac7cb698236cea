/*!
 * Retry policy for synthesis calls.
 *
 * The policy decides whether a failed attempt is retried and how long to
 * wait first. Waiting goes through a `Sleeper`, so tests can swap the
 * tokio clock for one that only records the requested delays.
 */

use async_trait::async_trait;
use log::warn;
use parking_lot::Mutex;
use rand::Rng;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::errors::SynthesisError;

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

/// Waits on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    /// Sum of all requested delays
    pub fn total(&self) -> Duration {
        self.slept.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Final failure of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    // @field: Attempts made, including the last one
    pub attempts: u32,
    pub error: SynthesisError,
}

/// Attempt cap and exponential backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: Duration::from_millis(8000),
            jitter: 0.0,
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Randomly shorten each delay by up to this fraction (0.0 - 1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based), before jitter
    pub fn nominal_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Delay after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_backoff(attempt);
        if self.jitter <= 0.0 {
            return nominal;
        }
        let cut = rand::rng().random_range(0.0..self.jitter);
        nominal.mul_f64(1.0 - cut)
    }

    /// Whether a failure on the given attempt (1-based) should be retried
    pub fn should_retry(&self, error: &SynthesisError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, label: &str, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SynthesisError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}",
                        label, attempt, self.max_attempts, error, delay
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(RetryFailure { attempts: attempt, error }),
            }
        }
    }
}

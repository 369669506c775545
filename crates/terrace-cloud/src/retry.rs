//! Bounded retry state machine
//!
//! Each operation owns a [`RetryState`]. After every failed attempt the state
//! decides whether to wait and try again or to give up; exhaustion turns the
//! last transient error into a permanent one.

use crate::error::ProviderError;
use crate::provider::RetryConfig;
use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given backoff and attempt again
    RetryAfter(Duration),
    /// Stop; the error is always permanent
    GiveUp(ProviderError),
}

#[derive(Debug, Clone)]
pub struct RetryState {
    config: RetryConfig,
    attempt: u32,
    next_delay: Duration,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        let next_delay = config.initial_delay.min(config.max_delay);
        Self {
            config,
            attempt: 0,
            next_delay,
        }
    }

    /// Count an attempt that is about to be made.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Backoff that the next retry would wait
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    pub fn on_failure(&mut self, error: ProviderError) -> RetryDecision {
        match error {
            ProviderError::Permanent(_) => RetryDecision::GiveUp(error),
            ProviderError::Transient(message) => {
                if self.attempt >= self.config.max_attempts.max(1) {
                    return RetryDecision::GiveUp(ProviderError::Permanent(format!(
                        "gave up after {} attempts: {}",
                        self.attempt, message
                    )));
                }
                let delay = self.next_delay;
                self.next_delay = self.grow(delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }

    fn grow(&self, delay: Duration) -> Duration {
        let multiplier = if self.config.backoff_multiplier.is_finite() {
            self.config.backoff_multiplier.max(1.0)
        } else {
            1.0
        };
        let scaled = Duration::from_nanos((delay.as_nanos() as f64 * multiplier).round() as u64);
        scaled.min(self.config.max_delay)
    }
}

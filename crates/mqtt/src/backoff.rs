//! Exponential backoff for reconnection retry timing.
//!
//! After a connection failure the kernel waits an increasing amount of time
//! between attempts instead of hammering a recovering broker:
//!
//! ```text
//! delay[n] = min(initial * factor^(n-1), max_delay)
//! ```
//!
//! The schedule resets when a connection succeeds. Once the delay has
//! saturated at `max_delay` (or an explicit attempt cap is hit), further
//! calls fail with `BackoffError` and the kernel gives up.

use std::time::Duration;

use thiserror::Error;

/// The retry budget is exhausted; the caller should stop retrying.
#[derive(Debug, Error)]
pub enum BackoffError {
    /// Maximum retry attempts exceeded; carries the effective limit.
    #[error("Maximum number of attempts exceeded: {0}")]
    MaxAttemptLimitError(u32),
}

/// Exponential backoff controller.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    current_delay: Duration,
    max_delay: Duration,
    factor: f64,
    attempt: u32,
    /// Explicit attempt cap; `None` falls back to the computed saturation
    /// point of the schedule.
    max_attempts: Option<u32>,
    calculated_max_attempts: u32,
}

impl Backoff {
    /// Creates a backoff with the given timing parameters.
    ///
    /// Degenerate inputs (`initial >= max` or `factor <= 1.0`) collapse the
    /// schedule to a single attempt.
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        let calculated_max_attempts = Self::calculate_max_attempts(initial, max, factor);
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max,
            factor,
            attempt: 0,
            max_attempts: None,
            calculated_max_attempts,
        }
    }

    /// Number of attempts until the delay saturates at `max`.
    ///
    /// Solves `initial * factor^n = max` for n; beyond that point retrying
    /// on a flat delay adds no information, so the schedule stops there.
    fn calculate_max_attempts(initial: Duration, max: Duration, factor: f64) -> u32 {
        if initial >= max || factor <= 1.0 {
            return 1;
        }

        let n = (max.as_secs_f64() / initial.as_secs_f64()).log(factor);
        n.floor() as u32 + 1
    }

    /// Overrides the computed attempt cap with an explicit limit.
    pub fn set_max_attempts(&mut self, max: u32) {
        self.max_attempts = Some(max);
    }

    /// Resets the schedule to its initial state. Call on successful connect.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Returns the next sleep duration and advances the schedule.
    ///
    /// # Errors
    ///
    /// Fails with `BackoffError::MaxAttemptLimitError` once the effective
    /// attempt cap is exceeded.
    pub fn next_sleep(&mut self) -> Result<Duration, BackoffError> {
        self.attempt += 1;
        let effective_max = self.max_attempts.unwrap_or(self.calculated_max_attempts);

        if self.attempt > effective_max {
            return Err(BackoffError::MaxAttemptLimitError(effective_max));
        }

        let sleep = self.current_delay;

        let next_delay = Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.factor);
        self.current_delay = next_delay.min(self.max_delay);

        Ok(sleep)
    }

    /// The configured delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// How many retries have been handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The computed saturation cap used when no explicit limit is set.
    pub fn calculated_max_attempts(&self) -> u32 {
        self.calculated_max_attempts
    }
}

impl Default for Backoff {
    /// Gentle defaults: 1 s initial, 60 s cap, 10% growth per attempt.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 1.1)
    }
}

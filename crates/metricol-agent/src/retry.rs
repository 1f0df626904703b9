//! Delivery retry: the backoff schedule and the states a delivery moves through.
//!
//! ```text
//! Idle -> Attempting(1) -> Delivered(1)
//!                       -> Backoff(1, d) -> Attempting(2) -> ...
//!                       -> Exhausted(n)      (n == max attempts)
//! any non-terminal state -> Cancelled
//! ```

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with optional jitter.
///
/// The delay after failed attempt `n` (0-based) is `min * factor^n`, capped at
/// `max`. With jitter the actual delay is drawn uniformly from `[min, delay]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Smallest delay.
    pub min: Duration,
    /// Largest delay.
    pub max: Duration,
    /// Growth per attempt.
    pub factor: f64,
    /// Randomise delays.
    pub jitter: bool,
}

impl Backoff {
    /// Doubling backoff between `min` and `max`, with jitter.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            ..Default::default()
        }
    }

    /// Set the growth factor.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Upper bound of the delay after failed attempt `attempt` (0-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.min.as_secs_f64() * self.factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            return self.max.max(self.min);
        }
        Duration::from_secs_f64(scaled).max(self.min)
    }

    /// Delay to sleep after failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.jitter || ceiling <= self.min {
            return ceiling;
        }
        rand::thread_rng().gen_range(self.min..=ceiling)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: true,
        }
    }
}

/// Where a delivery stands. Attempt numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Nothing sent yet.
    Idle,
    /// Sending attempt `n`.
    Attempting(u32),
    /// Attempt `n` failed; sleeping before the next one.
    Backoff(u32, Duration),
    /// All `n` attempts failed.
    Exhausted(u32),
    /// Attempt `n` succeeded.
    Delivered(u32),
    /// Cancelled before delivery.
    Cancelled,
}

impl RetryState {
    /// Whether no further transitions follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Exhausted(_) | RetryState::Delivered(_) | RetryState::Cancelled
        )
    }

    /// Next state after attempt `attempt` failed.
    pub fn after_failure(attempt: u32, max_attempts: u32, backoff: &Backoff) -> Self {
        if attempt >= max_attempts {
            RetryState::Exhausted(attempt)
        } else {
            RetryState::Backoff(attempt, backoff.delay(attempt - 1))
        }
    }
}

/// Outcome of one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    /// Terminal state reached.
    pub state: RetryState,
    /// Attempts made.
    pub attempts: u32,
    /// Delays slept between attempts, in order.
    pub delays: Vec<Duration>,
}

impl DeliveryReport {
    /// Whether the batch reached the server.
    pub fn delivered(&self) -> bool {
        matches!(self.state, RetryState::Delivered(_))
    }
}

//! Reconnect delays.

use std::time::Duration;

/// Exponential reconnect delay.
///
/// The first delay after a success is the base delay, each further failure
/// doubles it up to the maximum. Delays carry no jitter so a sequence of
/// failures always produces the same schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    failures: u32,
}

impl Backoff {
    /// Creates a backoff starting at `base` and capped at `max`.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.min(max);
        Self {
            base,
            max,
            current: base,
            failures: 0,
        }
    }

    /// Returns the delay to wait before the next attempt and advances the
    /// schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.failures = self.failures.saturating_add(1);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Restarts the schedule after a successful connect.
    pub const fn reset(&mut self) {
        self.current = self.base;
        self.failures = 0;
    }

    /// Returns the delay the next failure will wait.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Returns the number of consecutive failures since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}

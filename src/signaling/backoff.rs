//! Reconnection backoff policy
//!
//! The delay schedule is an explicit object rather than a closure over a
//! mutable counter, so it can be tested without timers. Growth is linear:
//! the delay before attempt *n* (1-indexed) is `base_delay * n`, which is
//! monotonically increasing and spreads reconnecting clients out without
//! the long tail exponential schedules develop.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Linear backoff schedule with a bounded attempt count
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_attempts: u32,
    use_jitter: bool,
    attempt: u32,
}

impl BackoffPolicy {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            base_delay: config.base_delay,
            max_attempts: config.max_attempts,
            use_jitter: config.use_jitter,
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt, or `None` when exhausted
    ///
    /// Advances the attempt counter. With jitter enabled each delay is
    /// perturbed by up to ±10%; the default keeps the schedule exact.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        let delay = self.base_delay * self.attempt;
        if self.use_jitter {
            let jitter = (rand::random::<f64>() - 0.5) * 0.2;
            let millis = delay.as_millis() as f64 * (1.0 + jitter);
            Some(Duration::from_millis(millis as u64))
        } else {
            Some(delay)
        }
    }

    /// Attempts handed out since the last reset
    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }

    /// Whether the schedule has no attempts left
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Restart the schedule after a successful connect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

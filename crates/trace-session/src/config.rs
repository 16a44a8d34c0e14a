//! Session configuration

use std::time::Duration;

/// Sampling cadence for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time between hardware sampling ticks
    pub interval: Duration,
    /// Delay before the first resource refresh and sample after start
    pub initial_delay: Duration,
}

impl SessionConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

    pub fn new(interval: Duration, initial_delay: Duration) -> Self {
        Self {
            interval,
            initial_delay,
        }
    }

    /// Build from fractional seconds. Values a `Duration` cannot hold
    /// (negative, non-finite, overflowing) fall back to the defaults.
    pub fn from_secs_f64(interval: f64, initial_delay: f64) -> Self {
        let secs =
            |v: f64, fallback: Duration| Duration::try_from_secs_f64(v).unwrap_or(fallback);

        Self {
            interval: secs(interval, Self::DEFAULT_INTERVAL),
            initial_delay: secs(initial_delay, Self::DEFAULT_INITIAL_DELAY),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_INITIAL_DELAY)
    }
}

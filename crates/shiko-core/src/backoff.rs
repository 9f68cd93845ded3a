//! Reconnect backoff
//!
//! Doubles the wait after every failed connect, starting at the floor and
//! clamped to the ceiling. A successful connect resets it.

use std::time::Duration;

/// First wait after a failure
pub const RECONNECT_FLOOR: Duration = Duration::from_secs(5);

/// Longest wait between attempts
pub const RECONNECT_CEILING: Duration = Duration::from_secs(320);

/// Exponential reconnect delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(RECONNECT_FLOOR, RECONNECT_CEILING)
    }
}

impl Backoff {
    /// Create a backoff with the given bounds
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            current: Duration::ZERO,
            floor,
            ceiling: ceiling.max(floor),
        }
    }

    /// Record a failure and return how long to wait
    pub fn next_delay(&mut self) -> Duration {
        self.current = self
            .current
            .saturating_mul(2)
            .max(self.floor)
            .min(self.ceiling);
        self.current
    }

    /// Record a success
    #[inline]
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }

    /// Last delay handed out, zero after a reset
    #[inline]
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Lower bound
    #[inline]
    #[must_use]
    pub fn floor(&self) -> Duration {
        self.floor
    }

    /// Upper bound
    #[inline]
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

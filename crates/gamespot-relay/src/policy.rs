//! Press retry policy.

use std::time::Duration;

/// How a single power action is pressed.
///
/// The first attempt holds the contact for `primary_ms`. When `fallback_ms`
/// is set and the first attempt fails (error or non-success reply), the
/// client waits `retry_delay` and presses exactly once more with the
/// fallback duration. There is never a third attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressPolicy {
    pub primary_ms: u64,
    pub fallback_ms: Option<u64>,
    pub retry_delay: Duration,
}

impl PressPolicy {
    /// One attempt, no retry.
    pub const fn single(primary_ms: u64) -> Self {
        Self {
            primary_ms,
            fallback_ms: None,
            retry_delay: Duration::ZERO,
        }
    }

    /// One attempt plus one retry with a different pulse.
    pub const fn with_fallback(primary_ms: u64, fallback_ms: u64, retry_delay: Duration) -> Self {
        Self {
            primary_ms,
            fallback_ms: Some(fallback_ms),
            retry_delay,
        }
    }

    /// Upper bound on wall time spent pressing, given the per-request buffer.
    pub fn worst_case(&self, timeout_buffer: Duration) -> Duration {
        let first = Duration::from_millis(self.primary_ms) + timeout_buffer;
        match self.fallback_ms {
            Some(fallback) => {
                first + self.retry_delay + Duration::from_millis(fallback) + timeout_buffer
            }
            None => first,
        }
    }
}

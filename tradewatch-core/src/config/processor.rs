//! Event processor configuration.

use std::time::Duration;

/// Bounded exponential backoff for event processing.
///
/// The delay after failed attempt `n` (1-based) is `multiplier * 2^(n-1)`
/// clamped to `[min_delay, max_delay]`. With the defaults that gives waits of
/// 2s, 2s, 4s, 8s between five attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let raw = self.multiplier.saturating_mul(1u32 << exponent);
        raw.max(self.min_delay).min(self.max_delay)
    }
}

/// Runtime configuration of the event processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Confirmations required before a trade counts as confirmed.
    pub confirmation_threshold: u64,
    /// Capacity of the in-memory event queue.
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            confirmation_threshold: 3,
            queue_capacity: crate::events::DEFAULT_CHANNEL_BUFFER,
            retry: RetryPolicy::default(),
        }
    }
}

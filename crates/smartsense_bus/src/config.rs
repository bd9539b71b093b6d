//! Bus tuning parameters.

use crate::events::EventError;
use std::time::Duration;

/// Configuration for an [`EventBus`](crate::EventBus).
///
/// Priorities above `priority_threshold` go to the high-priority tier, which
/// holds a quarter of the normal tier's capacity by default.
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    /// Capacity of the normal tier.
    pub max_queue_size: usize,
    /// Capacity of the high-priority tier.
    pub priority_queue_size: usize,
    pub priority_threshold: i32,
    /// Priority used when replaying history.
    pub replay_priority: i32,
    /// Deadline for the whole handler set of a single event.
    pub processing_timeout: Duration,
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub workers: usize,
    pub history_size: usize,
    pub priority_poll_timeout: Duration,
    pub regular_poll_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::with_queue_size(1000)
    }
}

impl BusConfig {
    /// Default configuration with the given normal-tier capacity.
    pub fn with_queue_size(max_queue_size: usize) -> Self {
        Self {
            max_queue_size,
            priority_queue_size: (max_queue_size / 4).max(1),
            priority_threshold: 5,
            replay_priority: -1,
            processing_timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            workers: 4,
            history_size: 1000,
            priority_poll_timeout: Duration::from_millis(100),
            regular_poll_timeout: Duration::from_secs(1),
        }
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn is_high_priority(&self, priority: i32) -> bool {
        priority > self.priority_threshold
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.max_queue_size == 0 || self.priority_queue_size == 0 {
            return Err(EventError::InvalidConfig(
                "queue capacities must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(EventError::InvalidConfig(
                "at least one dispatch worker is required".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(EventError::InvalidConfig(
                "history_size must be greater than 0".to_string(),
            ));
        }
        if self.processing_timeout.is_zero() {
            return Err(EventError::InvalidConfig(
                "processing_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

//! # Utility Functions
//!
//! Timestamp helpers and the bus factory used by applications and tests.
//!
//! ## Key Functions
//!
//! - [`current_timestamp()`] - Seconds since the Unix epoch
//! - [`current_timestamp_millis()`] - Milliseconds since the Unix epoch, used for event stamps
//! - [`create_event_bus()`] - Shared bus with the given configuration

use crate::config::BusConfig;
use crate::system::EventBus;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// A clock set before the epoch reports `0` rather than panicking.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Creates a new shared event bus.
///
/// The bus is returned stopped; call [`EventBus::start`] before publishing.
pub fn create_event_bus(config: BusConfig) -> Arc<EventBus> {
    Arc::new(EventBus::new(config))
}

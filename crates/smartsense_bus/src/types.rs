//! # Identifier Types
//!
//! Wrapper types for the identifiers the bus hands out. Keeping them distinct
//! prevents an event id from being passed where a subscription id is expected.
//!
//! ## Key Types
//!
//! - [`EventId`] - Unique identifier stamped on every published event
//! - [`SubscriptionId`] - Handle returned by `subscribe` and accepted by `unsubscribe`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a published event.
///
/// # Examples
///
/// ```rust
/// use smartsense_bus::EventId;
///
/// let id = EventId::new();
/// let parsed = EventId::from_str(&id.to_string())?;
/// assert_eq!(id, parsed);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an event ID from its hyphenated string form.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::str::FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Creates a new random subscription ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

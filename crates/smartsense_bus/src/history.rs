//! Bounded ring buffer of published events, used for replay.

use crate::events::{Event, EventType};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Selection criteria for [`EventBus::replay`](crate::EventBus::replay).
///
/// Every field is optional; an empty filter selects the whole history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayFilter {
    pub event_type: Option<EventType>,
    /// Matches the event's `source` component.
    pub component_name: Option<String>,
    /// Inclusive lower bound on the event timestamp, in milliseconds.
    pub since: Option<u64>,
}

impl ReplayFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn component(mut self, component_name: impl Into<String>) -> Self {
        self.component_name = Some(component_name.into());
        self
    }

    pub fn since(mut self, timestamp_millis: u64) -> Self {
        self.since = Some(timestamp_millis);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(event_type) = self.event_type {
            if event.event_type() != event_type {
                return false;
            }
        }
        if let Some(component) = &self.component_name {
            if &event.source != component {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp.unwrap_or(0) < since {
                return false;
            }
        }
        true
    }
}

/// Oldest entries are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct EventHistory {
    capacity: usize,
    entries: Mutex<VecDeque<Event>>,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, event: Event) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    /// Copies out matching events in publish order without touching the buffer.
    pub fn select(&self, filter: &ReplayFilter) -> Vec<Event> {
        self.lock()
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

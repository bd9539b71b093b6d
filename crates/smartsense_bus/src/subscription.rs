//! # Subscription Registry
//!
//! Owns every [`Subscription`] and the two lookup indexes (by event type and
//! by component). Callers elsewhere hold only [`SubscriptionId`]s or shared
//! `Arc<Subscription>` snapshots whose statistics are atomics.
//!
//! Deactivation is immediate for future lookups. A dispatch that already
//! collected the subscription still finishes delivering to it.

use crate::events::{Event, EventFilter, EventHandler, EventType};
use crate::types::SubscriptionId;
use crate::utils::current_timestamp_millis;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A registered (event type, handler, component) binding.
pub struct Subscription {
    pub id: SubscriptionId,
    pub event_type: EventType,
    pub component_name: String,
    pub created_at: u64,
    handler: Arc<dyn EventHandler>,
    filter: Option<EventFilter>,
    events_processed: AtomicU64,
    error_count: AtomicU64,
    /// Zero until the first successful delivery.
    last_processed: AtomicU64,
    is_active: AtomicBool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("component_name", &self.component_name)
            .field("handler", &self.handler.handler_name())
            .field("has_filter", &self.filter.is_some())
            .field("is_active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    pub fn new(
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
        component_name: impl Into<String>,
        filter: Option<EventFilter>,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            event_type,
            component_name: component_name.into(),
            created_at: current_timestamp_millis(),
            handler,
            filter,
            events_processed: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last_processed: AtomicU64::new(0),
            is_active: AtomicBool::new(true),
        }
    }

    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.is_active.store(false, Ordering::Release);
    }

    /// Evaluates the filter. A panicking filter lets the event through.
    pub fn matches(&self, event: &Event) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        match catch_unwind(AssertUnwindSafe(|| filter(event))) {
            Ok(pass) => pass,
            Err(_) => {
                warn!(
                    "⚠️ Filter for subscription {} ({}) panicked; delivering event anyway",
                    self.id, self.component_name
                );
                true
            }
        }
    }

    pub(crate) fn record_success(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        self.last_processed
            .store(current_timestamp_millis(), Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn last_processed(&self) -> Option<u64> {
        match self.last_processed.load(Ordering::Relaxed) {
            0 => None,
            ts => Some(ts),
        }
    }

    pub fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            subscription_id: self.id,
            event_type: self.event_type,
            component_name: self.component_name.clone(),
            handler_name: self.handler.handler_name().to_string(),
            created_at: self.created_at,
            events_processed: self.events_processed(),
            error_count: self.error_count(),
            last_processed: self.last_processed(),
            is_active: self.is_active(),
        }
    }
}

/// Point-in-time view of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub subscription_id: SubscriptionId,
    pub event_type: EventType,
    pub component_name: String,
    pub handler_name: String,
    pub created_at: u64,
    pub events_processed: u64,
    pub error_count: u64,
    pub last_processed: Option<u64>,
    pub is_active: bool,
}

/// Subscription counts reported in bus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCounts {
    pub total: usize,
    pub active: usize,
    pub by_event_type: BTreeMap<String, usize>,
    pub by_component: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<SubscriptionId, Arc<Subscription>>,
    by_type: DashMap<EventType, Vec<SubscriptionId>>,
    by_component: DashMap<String, Vec<SubscriptionId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription: Subscription) -> SubscriptionId {
        let id = subscription.id;
        let event_type = subscription.event_type;
        let component = subscription.component_name.clone();

        self.subscriptions.insert(id, Arc::new(subscription));
        self.by_type.entry(event_type).or_default().push(id);
        self.by_component.entry(component).or_default().push(id);
        id
    }

    /// Deactivates and unlinks a subscription. Returns it if it existed.
    pub fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let (_, subscription) = self.subscriptions.remove(&id)?;
        subscription.deactivate();

        if let Some(mut ids) = self.by_type.get_mut(&subscription.event_type) {
            ids.retain(|other| *other != id);
        }
        self.by_type
            .remove_if(&subscription.event_type, |_, ids| ids.is_empty());

        if let Some(mut ids) = self.by_component.get_mut(&subscription.component_name) {
            ids.retain(|other| *other != id);
        }
        self.by_component
            .remove_if(&subscription.component_name, |_, ids| ids.is_empty());

        Some(subscription)
    }

    /// Removes every subscription owned by `component_name`.
    pub fn remove_component(&self, component_name: &str) -> Vec<Arc<Subscription>> {
        let ids = self
            .by_component
            .get(component_name)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Active subscriptions for `event_type`, in registration order.
    pub fn active_for(&self, event_type: EventType) -> Vec<Arc<Subscription>> {
        let ids = match self.by_type.get(&event_type) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .filter(|subscription| subscription.is_active())
            .collect()
    }

    pub fn for_component(&self, component_name: &str) -> Vec<Arc<Subscription>> {
        let ids = match self.by_component.get(component_name) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn counts(&self) -> SubscriptionCounts {
        let mut counts = SubscriptionCounts::default();
        for entry in self.subscriptions.iter() {
            let subscription = entry.value();
            counts.total += 1;
            if subscription.is_active() {
                counts.active += 1;
            }
            *counts
                .by_event_type
                .entry(subscription.event_type.as_str().to_string())
                .or_default() += 1;
            *counts
                .by_component
                .entry(subscription.component_name.clone())
                .or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AsyncFnHandler, EventPayload, HandlerError};
    use crate::payloads::TextInputData;

    fn noop_handler() -> Arc<dyn EventHandler> {
        Arc::new(AsyncFnHandler::new("noop", |_event: Event| async {
            Ok::<(), HandlerError>(())
        }))
    }

    fn text_event(text: &str) -> Event {
        Event::new("keyboard", EventPayload::TextInput(TextInputData::new(text)))
    }

    #[test]
    fn test_indexes_follow_insert_and_remove() {
        let registry = SubscriptionRegistry::new();
        let a = registry.insert(Subscription::new(EventType::TextInput, noop_handler(), "nlp", None));
        let b = registry.insert(Subscription::new(EventType::TextInput, noop_handler(), "logger", None));
        registry.insert(Subscription::new(EventType::DisplayText, noop_handler(), "nlp", None));

        assert_eq!(registry.active_for(EventType::TextInput).len(), 2);
        assert_eq!(registry.for_component("nlp").len(), 2);

        let removed = registry.remove(a).unwrap();
        assert!(!removed.is_active());
        assert!(registry.remove(a).is_none());

        let remaining: Vec<_> = registry
            .active_for(EventType::TextInput)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(remaining, vec![b]);

        let counts = registry.counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.by_component.get("nlp"), Some(&1));
        assert_eq!(counts.by_event_type.get("text_input_event"), Some(&1));
    }

    #[test]
    fn test_remove_component_clears_all_bindings() {
        let registry = SubscriptionRegistry::new();
        registry.insert(Subscription::new(EventType::TextInput, noop_handler(), "nlp", None));
        registry.insert(Subscription::new(EventType::VoiceInput, noop_handler(), "nlp", None));
        registry.insert(Subscription::new(EventType::TextInput, noop_handler(), "ui", None));

        assert_eq!(registry.remove_component("nlp").len(), 2);
        assert!(registry.for_component("nlp").is_empty());
        assert!(registry.active_for(EventType::VoiceInput).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_filter_panic_fails_open() {
        let rejecting: EventFilter = Arc::new(|event: &Event| event.source == "camera");
        let panicking: EventFilter = Arc::new(|_event: &Event| -> bool { panic!("bad filter") });

        let strict = Subscription::new(EventType::TextInput, noop_handler(), "ui", Some(rejecting));
        let broken = Subscription::new(EventType::TextInput, noop_handler(), "ui", Some(panicking));

        assert!(!strict.matches(&text_event("hi")));
        assert!(broken.matches(&text_event("hi")));
    }
}

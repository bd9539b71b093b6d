/// Subscription management functions
use super::core::EventBus;
use super::stats::BusCounters;
use crate::events::{
    AsyncFnHandler, BlockingFnHandler, Event, EventFilter, EventHandler, EventType, HandlerError,
};
use crate::subscription::{Subscription, SubscriptionInfo};
use crate::types::SubscriptionId;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

impl EventBus {
    /// Registers a handler for one event type.
    ///
    /// Registration always succeeds. Several subscriptions to the same type
    /// are independent and each receives every matching event.
    pub fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
        component_name: &str,
        filter: Option<EventFilter>,
    ) -> SubscriptionId {
        let handler_name = handler.handler_name().to_string();
        let id = self
            .registry
            .insert(Subscription::new(event_type, handler, component_name, filter));
        BusCounters::bump(&self.counters.subscriptions_created);

        debug!(
            "📝 {} subscribed to {} via {} ({})",
            component_name, event_type, handler_name, id
        );
        id
    }

    /// Registers an async closure.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use smartsense_bus::*;
    ///
    /// let bus = EventBus::default();
    /// bus.on(EventType::DisplayText, "console", |event: Event| async move {
    ///     if let EventPayload::DisplayText(data) = &event.payload {
    ///         println!("{}", data.text);
    ///     }
    ///     Ok(())
    /// });
    /// ```
    pub fn on<F, Fut>(&self, event_type: EventType, component_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let name = format!("{}::{}", component_name, event_type);
        self.subscribe(
            event_type,
            Arc::new(AsyncFnHandler::new(name, handler)),
            component_name,
            None,
        )
    }

    /// Registers a synchronous closure; it runs on the blocking pool.
    pub fn on_blocking<F>(
        &self,
        event_type: EventType,
        component_name: &str,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name = format!("{}::{}", component_name, event_type);
        self.subscribe(
            event_type,
            Arc::new(BlockingFnHandler::new(name, handler)),
            component_name,
            None,
        )
    }

    /// Deactivates a subscription. Unknown ids are ignored.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        match self.registry.remove(subscription_id) {
            Some(subscription) => {
                BusCounters::bump(&self.counters.subscriptions_removed);
                debug!(
                    "🗑️ Unsubscribed {} from {} ({})",
                    subscription.component_name, subscription.event_type, subscription_id
                );
                true
            }
            None => false,
        }
    }

    /// Removes every subscription owned by a component and returns how many.
    pub fn unsubscribe_component(&self, component_name: &str) -> usize {
        let removed = self.registry.remove_component(component_name).len();
        if removed > 0 {
            BusCounters::add(&self.counters.subscriptions_removed, removed as u64);
            info!("🗑️ Removed {} subscriptions for {}", removed, component_name);
        }
        removed
    }

    pub fn get_subscription_info(&self, subscription_id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.registry.get(subscription_id).map(|s| s.info())
    }

    pub fn get_component_subscriptions(&self, component_name: &str) -> Vec<SubscriptionInfo> {
        self.registry
            .for_component(component_name)
            .iter()
            .map(|s| s.info())
            .collect()
    }
}

/// Dispatch workers and per-handler retry
use super::core::EventBus;
use super::stats::BusCounters;
use crate::events::{panic_message, Event, HandlerError};
use crate::queue::QueuedEvent;
use crate::subscription::Subscription;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, warn};

impl EventBus {
    /// Worker body: prefer the high-priority tier, fall back to the regular one.
    pub(super) async fn worker_loop(self: Arc<Self>, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        debug!("🔧 Dispatch worker {} started", worker_id);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                next = self.next_event() => next,
            };

            if let Some(queued) = next {
                self.dispatch(queued).await;
            }
        }

        debug!("🔧 Dispatch worker {} stopped", worker_id);
    }

    /// Takes queued work immediately, high tier first. When both tiers are
    /// empty, waits on both at once for at most one poll timeout.
    async fn next_event(&self) -> Option<QueuedEvent> {
        if let Some(item) = self.priority_queue.try_pop() {
            return Some(item);
        }
        if let Some(item) = self.regular_queue.try_pop() {
            return Some(item);
        }

        tokio::select! {
            biased;
            item = self.priority_queue.pop_timeout(self.config.priority_poll_timeout) => {
                item.or_else(|| self.regular_queue.try_pop())
            }
            item = self.regular_queue.pop_timeout(self.config.regular_poll_timeout) => item,
        }
    }

    /// Fans one event out to every matching active subscription.
    ///
    /// Handlers run as separate tasks. The whole set is bounded by the
    /// processing timeout; on expiry the event counts as failed and the
    /// handler tasks keep running.
    async fn dispatch(&self, queued: QueuedEvent) {
        let event = Arc::new(queued.event);
        let event_type = event.event_type();

        let targets: Vec<Arc<Subscription>> = self
            .registry
            .active_for(event_type)
            .into_iter()
            .filter(|subscription| subscription.matches(&event))
            .collect();

        if targets.is_empty() {
            debug!("📭 No subscribers for {}", event_type);
            return;
        }

        let retry_attempts = self.config.retry_attempts;
        let handles: Vec<_> = targets
            .into_iter()
            .map(|subscription| {
                let event = Arc::clone(&event);
                let delays: Vec<Duration> = (0..retry_attempts)
                    .map(|attempt| self.config.backoff_delay(attempt))
                    .collect();
                tokio::spawn(invoke_with_retry(subscription, event, delays))
            })
            .collect();

        let handler_count = handles.len();
        match tokio::time::timeout(self.config.processing_timeout, futures::future::join_all(handles)).await {
            Ok(_) => {
                BusCounters::bump(&self.counters.events_processed);
                debug!("✅ Dispatched {} to {} handlers", event_type, handler_count);
            }
            Err(_) => {
                BusCounters::bump(&self.counters.events_failed);
                warn!(
                    "⏰ Handlers for {} ({}) exceeded {:?}; leaving them to finish",
                    event_type,
                    event
                        .event_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    self.config.processing_timeout
                );
            }
        }
    }
}

/// Runs one handler with `delays.len()` retries, sleeping `delays[n]` after
/// failed attempt `n`.
async fn invoke_with_retry(subscription: Arc<Subscription>, event: Arc<Event>, delays: Vec<Duration>) {
    let handler_name = subscription.handler().handler_name().to_string();
    let total_attempts = delays.len() + 1;

    for attempt in 0..total_attempts {
        let outcome = AssertUnwindSafe(subscription.handler().handle(&event))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => {
                subscription.record_success();
                return;
            }
            Ok(Err(e)) => e,
            Err(panic) => HandlerError::Panicked(panic_message(&*panic)),
        };

        match delays.get(attempt) {
            Some(delay) => {
                warn!(
                    "🔁 Handler {} failed on attempt {}/{}: {}; retrying in {:?}",
                    handler_name,
                    attempt + 1,
                    total_attempts,
                    failure,
                    delay
                );
                tokio::time::sleep(*delay).await;
            }
            None => {
                subscription.record_error();
                error!(
                    "❌ Handler {} failed after {} attempts for {}: {}",
                    handler_name,
                    total_attempts,
                    event.event_type(),
                    failure
                );
            }
        }
    }
}

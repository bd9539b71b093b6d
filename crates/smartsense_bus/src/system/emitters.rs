/// Publishing and replay
use super::core::EventBus;
use super::stats::BusCounters;
use crate::events::{Event, EventError, EventType};
use crate::history::ReplayFilter;
use crate::queue::{PriorityQueue, QueuedEvent};
use crate::types::EventId;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl EventBus {
    /// Publishes an event.
    ///
    /// Assigns an id and timestamp where missing, records a copy in history and
    /// enqueues the event without waiting. Priorities above
    /// [`BusConfig::priority_threshold`](crate::BusConfig::priority_threshold)
    /// go to the high-priority tier.
    ///
    /// A full queue drops the event and increments `events_dropped`; the call
    /// still returns `Ok`. The only error is publishing to a stopped bus.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use smartsense_bus::*;
    ///
    /// # async fn example() -> Result<(), EventError> {
    /// let bus = create_event_bus(BusConfig::default());
    /// bus.start().await;
    ///
    /// let event = Event::new("keyboard", EventPayload::TextInput(TextInputData::new("hi")));
    /// let id = bus.publish(event, 0)?;
    /// println!("published {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn publish(&self, mut event: Event, priority: i32) -> Result<EventId, EventError> {
        if !self.is_running() {
            return Err(EventError::NotRunning);
        }

        let event_id = event.stamp();
        self.history.record(event.clone());
        self.enqueue(event, priority);
        Ok(event_id)
    }

    /// Re-publishes matching events from history at the replay priority.
    ///
    /// History is only read; replayed events are not recorded again. Returns
    /// the number of events replayed.
    pub fn replay(
        &self,
        event_type: Option<EventType>,
        component_name: Option<&str>,
        since: Option<u64>,
    ) -> Result<usize, EventError> {
        let filter = ReplayFilter {
            event_type,
            component_name: component_name.map(str::to_string),
            since,
        };
        self.replay_matching(&filter)
    }

    /// [`replay`](Self::replay) with a prepared filter.
    pub fn replay_matching(&self, filter: &ReplayFilter) -> Result<usize, EventError> {
        if !self.is_running() {
            return Err(EventError::NotRunning);
        }

        let events = self.history.select(filter);
        let count = events.len();
        for event in events {
            self.enqueue(event, self.config.replay_priority);
        }

        info!("🔄 Replayed {} events from history", count);
        Ok(count)
    }

    fn enqueue(&self, event: Event, priority: i32) {
        let queue: &PriorityQueue = if self.config.is_high_priority(priority) {
            &self.priority_queue
        } else {
            &self.regular_queue
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();
        let item = QueuedEvent {
            priority,
            sequence,
            event,
        };

        match queue.try_push(item) {
            Ok(()) => {
                BusCounters::bump(&self.counters.events_published);
                debug!(
                    "📤 Queued {} (priority {}) on {} queue",
                    event_type,
                    priority,
                    queue.name()
                );
            }
            Err(rejected) => {
                BusCounters::bump(&self.counters.events_dropped);
                warn!(
                    "⚠️ {} queue full ({}), dropping {} from {}",
                    queue.name(),
                    queue.capacity(),
                    event_type,
                    rejected.event.source
                );
            }
        }
    }
}

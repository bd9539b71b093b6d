/// Queue management and statistics
use super::core::EventBus;
use super::stats::{BusStatistics, QueueSizes};
use crate::queue::QueueSelector;
use tracing::info;

impl EventBus {
    /// Discards queued, undispatched events and returns how many were removed.
    pub fn clear_queue(&self, which: QueueSelector) -> usize {
        let removed = match which {
            QueueSelector::Regular => self.regular_queue.drain(),
            QueueSelector::Priority => self.priority_queue.drain(),
            QueueSelector::All => self.regular_queue.drain() + self.priority_queue.drain(),
        };
        info!("🧹 Cleared {} queued events ({:?})", removed, which);
        removed
    }

    pub fn queue_sizes(&self) -> QueueSizes {
        QueueSizes {
            regular: self.regular_queue.len(),
            priority: self.priority_queue.len(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Snapshot of counters, queue depths and subscription counts.
    ///
    /// Reading statistics never changes them.
    pub fn get_statistics(&self) -> BusStatistics {
        let (uptime_seconds, start_time) = self.uptime_and_start();
        BusStatistics {
            running: self.is_running(),
            uptime_seconds,
            start_time,
            queue_sizes: self.queue_sizes(),
            subscriptions: self.registry.counts(),
            statistics: self.counters.snapshot(),
            history_size: self.history.len(),
        }
    }
}

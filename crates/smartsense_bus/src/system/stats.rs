/// Statistics counters and snapshot types for the event bus
use crate::subscription::SubscriptionCounts;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated without locks from publishers and workers.
#[derive(Debug, Default)]
pub(crate) struct BusCounters {
    pub events_published: AtomicU64,
    pub events_processed: AtomicU64,
    pub events_failed: AtomicU64,
    pub events_dropped: AtomicU64,
    pub subscriptions_created: AtomicU64,
    pub subscriptions_removed: AtomicU64,
}

impl BusCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusCounterSnapshot {
        BusCounterSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            subscriptions_created: self.subscriptions_created.load(Ordering::Relaxed),
            subscriptions_removed: self.subscriptions_removed.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusCounterSnapshot {
    /// Events accepted into a queue.
    pub events_published: u64,
    /// Events whose handler set finished within the processing timeout.
    pub events_processed: u64,
    /// Events whose handler set exceeded the processing timeout.
    pub events_failed: u64,
    /// Events rejected because their queue was full.
    pub events_dropped: u64,
    pub subscriptions_created: u64,
    pub subscriptions_removed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSizes {
    pub regular: usize,
    pub priority: usize,
}

/// Read-only statistics snapshot, safe to poll at any rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusStatistics {
    pub running: bool,
    pub uptime_seconds: f64,
    /// Unix milliseconds of the last `start()`, if ever started.
    pub start_time: Option<u64>,
    pub queue_sizes: QueueSizes,
    pub subscriptions: SubscriptionCounts,
    pub statistics: BusCounterSnapshot,
    pub history_size: usize,
}

//! # Priority Dispatch Queues
//!
//! A bounded max-heap keyed by `(priority, sequence)`. Higher priorities pop
//! first; among equal priorities the lower sequence number (earlier publish)
//! pops first, which gives FIFO order within a tier.
//!
//! Pushing never waits: a full queue hands the event back to the caller.
//! Popping can wait for data up to a deadline using a [`Notify`].

use crate::events::Event;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// An event waiting for dispatch.
#[derive(Debug)]
pub struct QueuedEvent {
    pub priority: i32,
    pub sequence: u64,
    pub event: Event,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedEvent {}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Which tier(s) [`EventBus::clear_queue`](crate::EventBus::clear_queue) drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSelector {
    Regular,
    Priority,
    All,
}

/// Bounded priority queue shared by the publisher and the dispatch workers.
#[derive(Debug)]
pub struct PriorityQueue {
    name: &'static str,
    capacity: usize,
    heap: Mutex<BinaryHeap<QueuedEvent>>,
    available: Notify,
}

impl PriorityQueue {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            heap: Mutex::new(BinaryHeap::with_capacity(capacity.min(1024))),
            available: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Critical sections never await, so a poisoned lock still holds a valid heap.
    fn lock(&self) -> MutexGuard<'_, BinaryHeap<QueuedEvent>> {
        self.heap.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueues without waiting. Returns the item back when the queue is full.
    pub fn try_push(&self, item: QueuedEvent) -> Result<(), QueuedEvent> {
        {
            let mut heap = self.lock();
            if heap.len() >= self.capacity {
                return Err(item);
            }
            heap.push(item);
        }
        self.available.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<QueuedEvent> {
        self.lock().pop()
    }

    /// Pops the next item, waiting at most `timeout` for one to arrive.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<QueuedEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards everything queued and returns how many items were removed.
    pub fn drain(&self) -> usize {
        let mut heap = self.lock();
        let removed = heap.len();
        heap.clear();
        removed
    }
}

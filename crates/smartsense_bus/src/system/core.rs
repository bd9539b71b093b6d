/// Core EventBus implementation
use super::stats::BusCounters;
use crate::config::BusConfig;
use crate::history::EventHistory;
use crate::queue::PriorityQueue;
use crate::subscription::SubscriptionRegistry;
use crate::utils::current_timestamp_millis;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// In-process publish/subscribe bus with two priority tiers.
///
/// The bus owns the subscription registry, both queues, the history buffer
/// and the statistics counters. Every public operation is safe to call
/// concurrently; mutation of shared state goes through atomics, `DashMap`
/// shards or short non-async critical sections.
///
/// A fixed pool of dispatch workers (see [`BusConfig::workers`]) drains the
/// queues once [`EventBus::start`] has been called.
pub struct EventBus {
    pub(super) config: BusConfig,
    pub(super) registry: SubscriptionRegistry,
    pub(super) regular_queue: PriorityQueue,
    pub(super) priority_queue: PriorityQueue,
    pub(super) history: EventHistory,
    pub(super) counters: BusCounters,
    /// Monotonic tie-breaker embedded in every queue key.
    pub(super) sequence: AtomicU64,
    pub(super) running: AtomicBool,
    pub(super) started: Mutex<Option<(Instant, u64)>>,
    pub(super) shutdown_tx: watch::Sender<bool>,
    pub(super) workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("subscriptions", &self.registry.len())
            .field("regular_queue", &self.regular_queue.len())
            .field("priority_queue", &self.priority_queue.len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl EventBus {
    /// Creates a stopped bus with no subscriptions.
    pub fn new(config: BusConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            regular_queue: PriorityQueue::new("regular", config.max_queue_size),
            priority_queue: PriorityQueue::new("priority", config.priority_queue_size),
            history: EventHistory::new(config.history_size),
            registry: SubscriptionRegistry::new(),
            counters: BusCounters::default(),
            sequence: AtomicU64::new(0),
            running: AtomicBool::new(false),
            started: Mutex::new(None),
            shutdown_tx,
            workers: tokio::sync::Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the dispatch workers. Calling `start` on a running bus is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut workers = self.workers.lock().await;
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("⚠️ Event bus already running");
            return;
        }

        self.shutdown_tx.send_replace(false);
        *self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some((Instant::now(), current_timestamp_millis()));

        for worker_id in 0..self.config.workers {
            let bus = Arc::clone(self);
            let shutdown_rx = self.shutdown_tx.subscribe();
            workers.push(tokio::spawn(async move {
                bus.worker_loop(worker_id, shutdown_rx).await;
            }));
        }

        info!(
            "🚌 Event bus started with {} workers (queue capacity {} + {} priority)",
            self.config.workers, self.config.max_queue_size, self.config.priority_queue_size
        );
    }

    /// Stops accepting publishes, signals the workers and waits for them.
    ///
    /// A worker finishes the event it is dispatching before it exits. Events
    /// still queued are left in place; use
    /// [`clear_queue`](Self::clear_queue) to discard them.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        info!("🛑 Shutting down event bus");
        self.shutdown_tx.send_replace(true);

        let handles: Vec<JoinHandle<()>> = workers.drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!("⚠️ Dispatch worker ended abnormally: {}", e);
            }
        }

        let pending = self.regular_queue.len() + self.priority_queue.len();
        if pending > 0 {
            warn!("⚠️ Event bus stopped with {} undispatched events", pending);
        }
        info!("✅ Event bus stopped");
    }

    pub(super) fn uptime_and_start(&self) -> (f64, Option<u64>) {
        let started = *self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match started {
            Some((instant, wall_clock)) => (instant.elapsed().as_secs_f64(), Some(wall_clock)),
            None => (0.0, None),
        }
    }
}

//! # SmartSense Event Bus
//!
//! An in-process, asynchronous publish/subscribe bus. Producers publish typed
//! events; a fixed pool of dispatch workers delivers them to every matching
//! subscription with retry, backoff and a per-event processing timeout.
//!
//! ## Core Features
//!
//! - **Typed Events**: A closed [`EventType`] set with one payload struct per type
//! - **Two Priority Tiers**: Bounded normal and high-priority queues, FIFO within a priority
//! - **Non-blocking Publish**: A full queue drops the event and counts it
//! - **Handler Isolation**: Failures and panics are retried, logged and counted per subscription
//! - **History & Replay**: A bounded ring buffer that can be re-published by type, source or time
//! - **Statistics**: A serializable snapshot of counters, queue depths and subscriptions
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use smartsense_bus::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = create_event_bus(BusConfig::default());
//!     bus.start().await;
//!
//!     bus.on(EventType::TextInput, "console", |event: Event| async move {
//!         if let EventPayload::TextInput(data) = &event.payload {
//!             println!("user said: {}", data.text);
//!         }
//!         Ok(())
//!     });
//!
//!     bus.publish(
//!         Event::new("keyboard", EventPayload::TextInput(TextInputData::new("hello"))),
//!         0,
//!     )?;
//!
//!     bus.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod events;
pub mod history;
pub mod payloads;
pub mod queue;
pub mod subscription;
pub mod system;
pub mod types;
pub mod utils;

pub use config::BusConfig;
pub use events::{
    AsyncFnHandler, BlockingFnHandler, Event, EventError, EventFilter, EventHandler,
    EventPayload, EventType, HandlerError,
};
pub use history::ReplayFilter;
pub use payloads::*;
pub use queue::QueueSelector;
pub use subscription::{SubscriptionCounts, SubscriptionInfo};
pub use system::{BusCounterSnapshot, BusStatistics, EventBus, QueueSizes};
pub use types::{EventId, SubscriptionId};
pub use utils::{create_event_bus, current_timestamp, current_timestamp_millis};

// Re-export commonly used external types
pub use async_trait::async_trait;

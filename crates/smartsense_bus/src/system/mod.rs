/// Event bus module - broken down into manageable components
mod core;
mod dispatch;
mod emitters;
mod handlers;
mod management;
mod stats;

// Re-export all public items from submodules
pub use core::EventBus;
pub use stats::{BusCounterSnapshot, BusStatistics, QueueSizes};

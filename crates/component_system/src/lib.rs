//! # Component System
//!
//! Dependency-ordered lifecycle management for components that communicate
//! over a [`smartsense_bus::EventBus`].
//!
//! Components declare a startup priority and the component *types* they
//! depend on. The [`LifecycleManager`] resolves those declarations into a
//! single initialization order (dependencies first, then lowest priority,
//! then registration order), starts everything in that order, monitors
//! health periodically and shuts down in exactly the reverse order.
//!
//! ## Key Types
//!
//! - [`Component`] - The contract every managed component implements
//! - [`ComponentRegistration`] - Priority, dependencies and auto-start for one component
//! - [`LifecycleManager`] - Orchestrates startup, health checks, restart and shutdown
//! - [`SystemPhase`] / [`ComponentPhase`] - The two lifecycle state machines

pub mod component;
pub mod error;
pub mod graph;
pub mod manager;
pub mod phase;

pub use component::{
    Component, ComponentState, ComponentStatus, ComponentTypeRef, HealthRecord, HealthStatus,
};
pub use error::{ComponentError, LifecycleError};
pub use graph::DependencyGraph;
pub use manager::{
    ComponentRegistration, ComponentStatusReport, ComponentSummary, LifecycleConfig,
    LifecycleManager, SystemStatusReport,
};
pub use phase::{ComponentPhase, SystemPhase};

#[cfg(test)]
mod tests;

//! # Component Contract
//!
//! Every managed collaborator implements [`Component`]. The lifecycle manager
//! drives the contract; a component never calls it on itself.
//!
//! ## Key Types
//!
//! - [`Component`] - initialize / register_handlers / stop_processing / shutdown / health_check
//! - [`ComponentState`] - Bookkeeping helper most components embed
//! - [`HealthRecord`] - Point-in-time status snapshot returned by a health check
//! - [`ComponentTypeRef`] - Type identity used to declare dependencies

use crate::error::ComponentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartsense_bus::{current_timestamp_millis, EventBus, SubscriptionId};
use std::any::TypeId;
use std::sync::Arc;
use std::time::Instant;

/// Status a component reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Initializing,
    Ready,
    Busy,
    Error,
    ShuttingDown,
    Offline,
}

/// Health snapshot produced by [`Component::health_check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub component: String,
    pub status: ComponentStatus,
    pub initialized: bool,
    pub uptime_seconds: f64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub subscriptions: usize,
    /// Unix milliseconds.
    pub timestamp: u64,
}

/// Outcome of one health check as recorded by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HealthStatus {
    Reported(HealthRecord),
    Error { error: String, timestamp: u64 },
}

impl HealthStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, HealthStatus::Error { .. })
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            HealthStatus::Reported(record) => record.timestamp,
            HealthStatus::Error { timestamp, .. } => *timestamp,
        }
    }
}

/// Managed component contract.
///
/// Handlers a component subscribes in [`register_handlers`](Component::register_handlers)
/// must use [`name`](Component::name) as their component name so that a
/// restart can remove them before registering again.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Prepares the component. `Ok(false)` reports a non-exceptional failure.
    async fn initialize(&mut self) -> Result<bool, ComponentError>;

    /// Subscribes the component's handlers. Called after a successful initialize.
    async fn register_handlers(&mut self, _bus: Arc<EventBus>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Stops accepting new work. Called before [`shutdown`](Component::shutdown).
    async fn stop_processing(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError>;

    async fn health_check(&self) -> Result<HealthRecord, ComponentError>;

    fn status(&self) -> ComponentStatus;
}

/// Identity of a component type, used to declare dependencies before the
/// depended-on instance is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentTypeRef {
    pub id: TypeId,
    pub type_name: &'static str,
}

impl ComponentTypeRef {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        match base.rfind("::") {
            Some(idx) => &self.type_name[idx + 2..],
            None => self.type_name,
        }
    }
}

/// Common component bookkeeping.
///
/// Embed one of these and forward `status()` / `health_check()` to it.
#[derive(Debug, Clone)]
pub struct ComponentState {
    name: String,
    status: ComponentStatus,
    initialized: bool,
    startup_time: Option<Instant>,
    error_count: u64,
    last_error: Option<String>,
    subscriptions: Vec<SubscriptionId>,
}

impl ComponentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ComponentStatus::Offline,
            initialized: false,
            startup_time: None,
            error_count: 0,
            last_error: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ComponentStatus) {
        self.status = status;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Records a successful start.
    pub fn mark_ready(&mut self) {
        self.initialized = true;
        self.status = ComponentStatus::Ready;
        self.startup_time = Some(Instant::now());
    }

    /// Records a stop and forgets tracked subscriptions.
    pub fn mark_offline(&mut self) {
        self.initialized = false;
        self.status = ComponentStatus::Offline;
        self.subscriptions.clear();
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error_count += 1;
        self.last_error = Some(error.into());
        self.status = ComponentStatus::Error;
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn track_subscription(&mut self, id: SubscriptionId) {
        self.subscriptions.push(id);
    }

    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.startup_time
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn health_record(&self) -> HealthRecord {
        HealthRecord {
            component: self.name.clone(),
            status: self.status,
            initialized: self.initialized,
            uptime_seconds: self.uptime_seconds(),
            error_count: self.error_count,
            last_error: self.last_error.clone(),
            subscriptions: self.subscriptions.len(),
            timestamp: current_timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Speaker;

    #[test]
    fn test_type_ref_identity() {
        let a = ComponentTypeRef::of::<Speaker>();
        let b = ComponentTypeRef::of::<Speaker>();
        let other = ComponentTypeRef::of::<String>();

        assert_eq!(a, b);
        assert_ne!(a, other);
        assert_eq!(a.short_name(), "Speaker");
    }

    #[test]
    fn test_state_health_record() {
        let mut state = ComponentState::new("nlp");
        assert_eq!(state.status(), ComponentStatus::Offline);

        state.mark_ready();
        state.track_subscription(SubscriptionId::new());
        state.record_error("model timeout");

        let record = state.health_record();
        assert_eq!(record.component, "nlp");
        assert_eq!(record.status, ComponentStatus::Error);
        assert!(record.initialized);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("model timeout"));
        assert_eq!(record.subscriptions, 1);

        state.mark_offline();
        assert_eq!(state.subscriptions().len(), 0);
        assert!(!state.is_initialized());
    }
}

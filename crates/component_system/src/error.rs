//! Error types for components and the lifecycle manager.

use smartsense_bus::EventError;
use thiserror::Error;

/// Failure reported by a component through its contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Component initialization error: {0}")]
    Initialization(String),

    #[error("Component shutdown error: {0}")]
    Shutdown(String),

    #[error("Health check error: {0}")]
    HealthCheck(String),

    #[error("Handler registration error: {0}")]
    Registration(String),

    #[error("Component error: {0}")]
    Other(String),
}

impl From<EventError> for ComponentError {
    fn from(e: EventError) -> Self {
        ComponentError::Registration(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("Dependency ordering left unresolved components: {}", remaining.join(", "))]
    UnresolvedOrdering { remaining: Vec<String> },

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Component already registered: {0}")]
    DuplicateComponent(String),

    #[error("Invalid phase transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        subject: String,
        from: String,
        to: String,
    },

    #[error("System already initialized")]
    AlreadyInitialized,

    #[error("Component initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Service setup failed: {0}")]
    ServiceSetup(String),
}

impl From<EventError> for LifecycleError {
    fn from(e: EventError) -> Self {
        LifecycleError::ServiceSetup(e.to_string())
    }
}

//! # Lifecycle Manager
//!
//! Registers components with a priority and declared dependency types,
//! resolves them into a startup order, drives phased startup and shutdown,
//! runs the periodic health monitor and restarts single components.
//!
//! ## Startup
//!
//! `initialize()` walks the system phases, starts the event bus, resolves the
//! dependency graph (a cycle aborts before any component starts) and then
//! initializes auto-start components in order. A component that fails is
//! marked `Error`; the rest still start.
//!
//! ## Shutdown
//!
//! `shutdown()` stops the health monitor, tears components down in exactly
//! the reverse of the startup order and finally stops the bus.

use crate::component::{Component, ComponentStatus, ComponentTypeRef, HealthStatus};
use crate::error::{ComponentError, LifecycleError};
use crate::graph::DependencyGraph;
use crate::phase::{ComponentPhase, SystemPhase};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use smartsense_bus::{current_timestamp_millis, EventBus};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing settings for the lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub health_check_interval: Duration,
    /// A check that takes longer is recorded as an error.
    pub health_check_timeout: Duration,
    /// Time allowed for `shutdown()`, enforced by the caller.
    pub shutdown_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(60),
            health_check_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Builder describing how a component is managed.
///
/// # Examples
///
/// ```rust,ignore
/// let registration = ComponentRegistration::new(NlpProcessor::new(&settings))
///     .priority(10)
///     .depends_on::<TextOutputHandler>()
///     .auto_start(true);
/// manager.register(registration).await?;
/// ```
pub struct ComponentRegistration {
    component: Box<dyn Component>,
    type_ref: ComponentTypeRef,
    priority: i32,
    dependencies: Vec<ComponentTypeRef>,
    auto_start: bool,
}

impl ComponentRegistration {
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            component: Box::new(component),
            type_ref: ComponentTypeRef::of::<C>(),
            priority: 0,
            dependencies: Vec::new(),
            auto_start: true,
        }
    }

    /// Lower values start earlier when dependencies leave a choice.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on<T: Component>(self) -> Self {
        self.depends_on_type(ComponentTypeRef::of::<T>())
    }

    pub fn depends_on_type(mut self, dependency: ComponentTypeRef) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}

/// Lifecycle bookkeeping for one component.
#[derive(Debug, Clone)]
struct ComponentRuntime {
    phase: ComponentPhase,
    registered_at: u64,
    initialized_at: Option<u64>,
    started_at: Option<u64>,
    shutdown_at: Option<u64>,
    last_health_check: Option<u64>,
    health_status: Option<HealthStatus>,
    error_count: u64,
    last_error: Option<String>,
}

struct ManagedComponent {
    name: String,
    type_ref: ComponentTypeRef,
    priority: i32,
    dependencies: Vec<ComponentTypeRef>,
    auto_start: bool,
    sequence: usize,
    component: RwLock<Box<dyn Component>>,
    runtime: RwLock<ComponentRuntime>,
}

impl ManagedComponent {
    async fn phase(&self) -> ComponentPhase {
        self.runtime.read().await.phase
    }

    async fn transition(&self, next: ComponentPhase) -> Result<(), LifecycleError> {
        let mut runtime = self.runtime.write().await;
        if !runtime.phase.can_transition_to(next) {
            warn!(
                "⚠️ Rejected phase change for {}: {} -> {}",
                self.name, runtime.phase, next
            );
            return Err(LifecycleError::InvalidTransition {
                subject: self.name.clone(),
                from: runtime.phase.to_string(),
                to: next.to_string(),
            });
        }
        debug!("🔀 {}: {} -> {}", self.name, runtime.phase, next);
        runtime.phase = next;
        Ok(())
    }

    async fn mark_failed(&self, message: String) {
        let mut runtime = self.runtime.write().await;
        runtime.error_count += 1;
        runtime.last_error = Some(message.clone());
        runtime.phase = ComponentPhase::Error;
        error!("❌ Component {} failed: {}", self.name, message);
    }
}

/// Per-component entry in [`SystemStatusReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub phase: ComponentPhase,
    pub priority: i32,
    pub auto_start: bool,
    pub initialized_at: Option<u64>,
    pub started_at: Option<u64>,
    pub error_count: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatusReport {
    pub system_phase: SystemPhase,
    pub uptime_seconds: f64,
    pub startup_time: Option<u64>,
    pub shutdown_time: Option<u64>,
    pub total_components: usize,
    pub initialization_order: Vec<String>,
    pub components: BTreeMap<String, ComponentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatusReport {
    pub name: String,
    pub type_name: String,
    pub phase: ComponentPhase,
    pub priority: i32,
    pub auto_start: bool,
    pub dependencies: Vec<String>,
    pub registered_at: u64,
    pub initialized_at: Option<u64>,
    pub started_at: Option<u64>,
    pub shutdown_at: Option<u64>,
    pub last_health_check: Option<u64>,
    pub health_status: Option<HealthStatus>,
    pub error_count: u64,
    pub last_error: Option<String>,
}

type ComponentMap = DashMap<String, Arc<ManagedComponent>>;

struct HealthMonitor {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Dependency-ordered component orchestrator.
///
/// The manager is an explicit context object: it receives the bus it drives
/// at construction and is owned by the application entry point.
pub struct LifecycleManager {
    bus: Arc<EventBus>,
    config: LifecycleConfig,
    components: Arc<ComponentMap>,
    next_sequence: AtomicUsize,
    system_phase: RwLock<SystemPhase>,
    initialization_order: RwLock<Vec<String>>,
    started: AtomicBool,
    startup_time: RwLock<Option<(Instant, u64)>>,
    shutdown_time: RwLock<Option<u64>>,
    health_monitor: Mutex<Option<HealthMonitor>>,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("components", &self.components.len())
            .field("config", &self.config)
            .finish()
    }
}

impl LifecycleManager {
    pub fn new(bus: Arc<EventBus>, config: LifecycleConfig) -> Self {
        Self {
            bus,
            config,
            components: Arc::new(DashMap::new()),
            next_sequence: AtomicUsize::new(0),
            system_phase: RwLock::new(SystemPhase::Initializing),
            initialization_order: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
            startup_time: RwLock::new(None),
            shutdown_time: RwLock::new(None),
            health_monitor: Mutex::new(None),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_names(&self) -> Vec<String> {
        let mut entries: Vec<(usize, String)> = self
            .components
            .iter()
            .map(|entry| (entry.value().sequence, entry.key().clone()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, name)| name).collect()
    }

    pub async fn system_phase(&self) -> SystemPhase {
        *self.system_phase.read().await
    }

    pub async fn initialization_order(&self) -> Vec<String> {
        self.initialization_order.read().await.clone()
    }

    pub async fn component_phase(&self, name: &str) -> Option<ComponentPhase> {
        let managed = self.get(name)?;
        let phase = managed.phase().await;
        Some(phase)
    }

    fn get(&self, name: &str) -> Option<Arc<ManagedComponent>> {
        self.components.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Registers a component. Dependencies are matched by type later, when
    /// the graph is resolved, so registration order does not matter.
    pub async fn register(&self, registration: ComponentRegistration) -> Result<(), LifecycleError> {
        let name = registration.component.name().to_string();
        let slot = match self.components.entry(name.clone()) {
            Entry::Occupied(_) => return Err(LifecycleError::DuplicateComponent(name)),
            Entry::Vacant(slot) => slot,
        };

        let managed = ManagedComponent {
            name: name.clone(),
            type_ref: registration.type_ref,
            priority: registration.priority,
            dependencies: registration.dependencies,
            auto_start: registration.auto_start,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            component: RwLock::new(registration.component),
            runtime: RwLock::new(ComponentRuntime {
                phase: ComponentPhase::Registered,
                registered_at: current_timestamp_millis(),
                initialized_at: None,
                started_at: None,
                shutdown_at: None,
                last_health_check: None,
                health_status: None,
                error_count: 0,
                last_error: None,
            }),
        };

        info!(
            "📦 Registered component {} (priority {}, {} dependencies, auto_start={})",
            name,
            managed.priority,
            managed.dependencies.len(),
            managed.auto_start
        );
        slot.insert(Arc::new(managed));
        Ok(())
    }

    /// Registers a component from its parts.
    pub async fn register_component<C: Component>(
        &self,
        component: C,
        priority: i32,
        dependencies: Vec<ComponentTypeRef>,
        auto_start: bool,
    ) -> Result<(), LifecycleError> {
        let registration = dependencies.into_iter().fold(
            ComponentRegistration::new(component)
                .priority(priority)
                .auto_start(auto_start),
            |registration, dependency| registration.depends_on_type(dependency),
        );
        self.register(registration).await
    }

    async fn set_system_phase(&self, next: SystemPhase) -> Result<(), LifecycleError> {
        let mut phase = self.system_phase.write().await;
        if !phase.can_transition_to(next) {
            warn!("⚠️ Rejected system phase change: {} -> {}", *phase, next);
            return Err(LifecycleError::InvalidTransition {
                subject: "system".to_string(),
                from: phase.to_string(),
                to: next.to_string(),
            });
        }
        info!("🔀 System phase: {} -> {}", *phase, next);
        *phase = next;
        Ok(())
    }

    async fn fail_system(&self, error: LifecycleError) -> LifecycleError {
        error!("❌ System initialization failed: {}", error);
        let _ = self.set_system_phase(SystemPhase::Error).await;
        error
    }

    /// Builds the dependency graph and computes the initialization order.
    ///
    /// Dependencies on a type with no registered instance are logged and
    /// ignored. A cycle is fatal.
    pub async fn resolve_dependencies(&self) -> Result<Vec<String>, LifecycleError> {
        let mut managed: Vec<Arc<ManagedComponent>> = self
            .components
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        managed.sort_by_key(|component| component.sequence);

        let mut graph = DependencyGraph::new();
        for component in &managed {
            graph.add_node(component.name.clone(), component.priority, component.sequence);
        }

        for (dependent, component) in managed.iter().enumerate() {
            for dependency in &component.dependencies {
                let providers: Vec<usize> = managed
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| candidate.type_ref.id == dependency.id)
                    .map(|(index, _)| index)
                    .collect();

                if providers.is_empty() {
                    warn!(
                        "⚠️ {} depends on {} but no such component is registered; ignoring",
                        component.name,
                        dependency.short_name()
                    );
                }
                for provider in providers {
                    graph.add_edge(provider, dependent);
                }
            }
        }

        let order: Vec<String> = graph
            .initialization_order()?
            .into_iter()
            .map(|index| graph.name(index).to_string())
            .collect();

        info!("🧭 Initialization order: [{}]", order.join(", "));
        *self.initialization_order.write().await = order.clone();
        Ok(order)
    }

    /// Brings the whole system up.
    ///
    /// Only structural failures (a dependency cycle, bus setup) are returned
    /// as errors; individual component failures leave that component in
    /// `Error` and the system still reaches `Ready`.
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::AlreadyInitialized);
        }

        info!("🚀 Initializing system with {} components", self.components.len());
        *self.startup_time.write().await = Some((Instant::now(), current_timestamp_millis()));

        self.set_system_phase(SystemPhase::LoadingConfig).await?;
        debug!("Configuration supplied at construction: {:?}", self.config);

        self.set_system_phase(SystemPhase::SettingUpServices).await?;
        if let Err(e) = self.bus.config().validate() {
            return Err(self.fail_system(e.into()).await);
        }
        self.bus.start().await;

        self.set_system_phase(SystemPhase::InitializingComponents).await?;
        let order = match self.resolve_dependencies().await {
            Ok(order) => order,
            Err(e) => return Err(self.fail_system(e).await),
        };
        self.initialize_components(&order).await;

        self.start_health_monitor().await;
        self.set_system_phase(SystemPhase::Ready).await?;

        let mut ready = 0;
        for name in &order {
            if self.component_phase(name).await == Some(ComponentPhase::Ready) {
                ready += 1;
            }
        }
        info!("✅ System ready: {}/{} components running", ready, order.len());
        Ok(())
    }

    async fn initialize_components(&self, order: &[String]) {
        for name in order {
            let Some(managed) = self.get(name) else {
                continue;
            };
            if !managed.auto_start {
                info!("⏸️ Skipping {} (auto_start disabled)", name);
                continue;
            }
            if let Err(e) = self.start_component(&managed).await {
                debug!("Continuing after failure of {}: {}", name, e);
            }
        }
    }

    async fn start_component(&self, managed: &ManagedComponent) -> Result<(), LifecycleError> {
        managed.transition(ComponentPhase::Initializing).await?;
        info!("🔧 Initializing component: {}", managed.name);

        let mut component = managed.component.write().await;
        let outcome = match AssertUnwindSafe(component.initialize()).catch_unwind().await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err("initialize reported failure".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("initialize panicked".to_string()),
        };

        let outcome = match outcome {
            Ok(()) => match AssertUnwindSafe(component.register_handlers(Arc::clone(&self.bus)))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err("handler registration panicked".to_string()),
            },
            Err(message) => Err(message),
        };
        drop(component);

        match outcome {
            Ok(()) => {
                let now = current_timestamp_millis();
                {
                    let mut runtime = managed.runtime.write().await;
                    runtime.initialized_at = Some(now);
                    runtime.started_at = Some(now);
                    runtime.shutdown_at = None;
                }
                managed.transition(ComponentPhase::Ready).await?;
                info!("✅ Component ready: {}", managed.name);
                Ok(())
            }
            Err(message) => {
                self.bus.unsubscribe_component(&managed.name);
                managed.mark_failed(message.clone()).await;
                Err(LifecycleError::InitializationFailed(format!(
                    "{}: {}",
                    managed.name, message
                )))
            }
        }
    }

    async fn stop_component(&self, managed: &ManagedComponent) -> Result<(), ComponentError> {
        managed
            .transition(ComponentPhase::ShuttingDown)
            .await
            .map_err(|e| ComponentError::Shutdown(e.to_string()))?;
        info!("🛑 Shutting down component: {}", managed.name);

        let mut component = managed.component.write().await;
        match AssertUnwindSafe(component.stop_processing()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("⚠️ {} failed to stop processing cleanly: {}", managed.name, e),
            Err(_) => error!("❌ {} panicked while stopping processing", managed.name),
        }

        let result = match AssertUnwindSafe(component.shutdown()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(ComponentError::Shutdown("shutdown panicked".to_string())),
        };
        drop(component);

        self.bus.unsubscribe_component(&managed.name);

        match result {
            Ok(()) => {
                managed.runtime.write().await.shutdown_at = Some(current_timestamp_millis());
                let _ = managed.transition(ComponentPhase::Offline).await;
                info!("✅ Component stopped: {}", managed.name);
                Ok(())
            }
            Err(e) => {
                managed.mark_failed(e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Runs every component's health check once and records the outcome.
    ///
    /// Observational only: component phases are never changed here.
    pub async fn perform_health_checks(&self) -> BTreeMap<String, HealthStatus> {
        run_health_checks(&self.components, self.config.health_check_timeout).await
    }

    async fn start_health_monitor(&self) {
        let (stop, mut stop_rx) = watch::channel(false);
        let components = Arc::clone(&self.components);
        let interval = self.config.health_check_interval;
        let timeout = self.config.health_check_timeout;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        run_health_checks(&components, timeout).await;
                    }
                }
            }
            debug!("🩺 Health monitor stopped");
        });

        info!("🩺 Health monitor running every {:?}", interval);
        *self.health_monitor.lock().await = Some(HealthMonitor { stop, handle });
    }

    async fn stop_health_monitor(&self) -> bool {
        let Some(monitor) = self.health_monitor.lock().await.take() else {
            return true;
        };
        let _ = monitor.stop.send(true);
        match monitor.handle.await {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Health monitor ended abnormally: {}", e);
                false
            }
        }
    }

    /// Shuts the system down in reverse initialization order.
    ///
    /// Per-component failures are logged and do not stop the sequence. The
    /// system ends `Offline`, or stays `Error` if it was already failed or
    /// the sequence itself broke.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let phase = self.system_phase().await;
        match phase {
            SystemPhase::Offline | SystemPhase::ShuttingDown => return Ok(()),
            SystemPhase::Error => info!("🧹 Cleaning up after failed initialization"),
            SystemPhase::Ready => self.set_system_phase(SystemPhase::ShuttingDown).await?,
            other => warn!("⚠️ Shutdown requested while system is {}", other),
        }

        let monitor_clean = self.stop_health_monitor().await;

        let order = self.initialization_order().await;
        info!("🛑 Shutting down {} components", order.len());
        let mut failures = 0;
        for name in order.iter().rev() {
            let Some(managed) = self.get(name) else {
                continue;
            };
            if !managed.phase().await.is_started() {
                debug!("Skipping {} (never started)", name);
                continue;
            }
            if let Err(e) = self.stop_component(&managed).await {
                failures += 1;
                error!("❌ Failed to shut down {}: {}", name, e);
            }
        }

        self.bus.shutdown().await;
        *self.shutdown_time.write().await = Some(current_timestamp_millis());

        if phase == SystemPhase::Error {
            return Ok(());
        }
        if !monitor_clean {
            self.set_system_phase(SystemPhase::Error).await?;
            return Ok(());
        }

        self.set_system_phase(SystemPhase::Offline).await?;
        info!("✅ System offline ({} component shutdown failures)", failures);
        Ok(())
    }

    /// Shuts down and re-initializes one component in place.
    ///
    /// Old subscriptions are removed before the component registers its
    /// handlers again. A failure leaves the component in `Error`; there is no
    /// automatic retry.
    pub async fn restart_component(&self, name: &str) -> Result<(), LifecycleError> {
        let managed = self
            .get(name)
            .ok_or_else(|| LifecycleError::ComponentNotFound(name.to_string()))?;

        info!("🔄 Restarting component: {}", name);
        if managed.phase().await.is_started() {
            if let Err(e) = self.stop_component(&managed).await {
                warn!("⚠️ Restart of {} continuing after shutdown failure: {}", name, e);
            }
        }
        self.bus.unsubscribe_component(name);

        {
            let mut order = self.initialization_order.write().await;
            if !order.iter().any(|existing| existing == name) {
                order.push(name.to_string());
            }
        }

        self.start_component(&managed).await?;
        info!("✅ Component restarted: {}", name);
        Ok(())
    }

    pub async fn get_system_status(&self) -> SystemStatusReport {
        let startup = *self.startup_time.read().await;
        let managed_components: Vec<Arc<ManagedComponent>> = self
            .components
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut components = BTreeMap::new();
        for managed in managed_components {
            let runtime = managed.runtime.read().await.clone();
            components.insert(
                managed.name.clone(),
                ComponentSummary {
                    phase: runtime.phase,
                    priority: managed.priority,
                    auto_start: managed.auto_start,
                    initialized_at: runtime.initialized_at,
                    started_at: runtime.started_at,
                    error_count: runtime.error_count,
                    last_error: runtime.last_error,
                },
            );
        }

        SystemStatusReport {
            system_phase: self.system_phase().await,
            uptime_seconds: startup
                .map(|(instant, _)| instant.elapsed().as_secs_f64())
                .unwrap_or(0.0),
            startup_time: startup.map(|(_, wall_clock)| wall_clock),
            shutdown_time: *self.shutdown_time.read().await,
            total_components: components.len(),
            initialization_order: self.initialization_order().await,
            components,
        }
    }

    pub async fn get_component_status(&self, name: &str) -> Option<ComponentStatusReport> {
        let managed = self.get(name)?;
        let runtime = managed.runtime.read().await.clone();
        Some(ComponentStatusReport {
            name: managed.name.clone(),
            type_name: managed.type_ref.short_name().to_string(),
            phase: runtime.phase,
            priority: managed.priority,
            auto_start: managed.auto_start,
            dependencies: managed
                .dependencies
                .iter()
                .map(|dependency| dependency.short_name().to_string())
                .collect(),
            registered_at: runtime.registered_at,
            initialized_at: runtime.initialized_at,
            started_at: runtime.started_at,
            shutdown_at: runtime.shutdown_at,
            last_health_check: runtime.last_health_check,
            health_status: runtime.health_status,
            error_count: runtime.error_count,
            last_error: runtime.last_error,
        })
    }
}

/// Checks every component concurrently so one slow or failing check does not
/// hold up the others.
async fn run_health_checks(components: &ComponentMap, timeout: Duration) -> BTreeMap<String, HealthStatus> {
    let managed: Vec<Arc<ManagedComponent>> = components
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect();

    let checks = managed.into_iter().map(|managed| async move {
        // Waiting for the component lock counts against the timeout.
        let check = async {
            let component = managed.component.read().await;
            AssertUnwindSafe(component.health_check()).catch_unwind().await
        };
        let status = match tokio::time::timeout(timeout, check).await {
            Ok(Ok(Ok(record))) => HealthStatus::Reported(record),
            Ok(Ok(Err(e))) => HealthStatus::Error {
                error: e.to_string(),
                timestamp: current_timestamp_millis(),
            },
            Ok(Err(_)) => HealthStatus::Error {
                error: "health check panicked".to_string(),
                timestamp: current_timestamp_millis(),
            },
            Err(_) => HealthStatus::Error {
                error: format!("health check timed out after {:?}", timeout),
                timestamp: current_timestamp_millis(),
            },
        };

        match &status {
            HealthStatus::Error { error, .. } => {
                error!("❌ Health check failed for {}: {}", managed.name, error);
            }
            HealthStatus::Reported(record) if record.status != ComponentStatus::Ready => {
                warn!("⚠️ {} reports status {:?}", managed.name, record.status);
            }
            HealthStatus::Reported(_) => {}
        }

        {
            let mut runtime = managed.runtime.write().await;
            runtime.last_health_check = Some(status.timestamp());
            runtime.health_status = Some(status.clone());
        }
        (managed.name.clone(), status)
    });

    futures::future::join_all(checks).await.into_iter().collect()
}

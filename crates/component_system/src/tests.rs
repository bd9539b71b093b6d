//! Tests for dependency-ordered startup, shutdown, health checks and restart

use crate::{
    Component, ComponentError, ComponentPhase, ComponentRegistration, ComponentState,
    ComponentStatus, HealthRecord, HealthStatus, LifecycleConfig, LifecycleError,
    LifecycleManager, SystemPhase,
};
use async_trait::async_trait;
use smartsense_bus::{BusConfig, Event, EventBus, EventType, HandlerError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    /// Component names recorded under `prefix`, in order.
    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix(prefix))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Configurable test component. Each `N` is a distinct type so stubs can
/// depend on each other by type.
struct Stub<const N: u8> {
    state: ComponentState,
    journal: Journal,
    fail_init: Arc<AtomicBool>,
    report_false: bool,
    panic_on_init: bool,
    unhealthy: bool,
    subscribe: bool,
    health_checks: Arc<AtomicUsize>,
    hold_init: Arc<AtomicBool>,
    release_init: Arc<Notify>,
    panic_on_stop_processing: bool,
    shutdown_failure: Option<ShutdownFailure>,
}

#[derive(Clone, Copy)]
enum ShutdownFailure {
    Error,
    Panic,
}

impl<const N: u8> Stub<N> {
    fn new(name: &str, journal: &Journal) -> Self {
        Self {
            state: ComponentState::new(name),
            journal: journal.clone(),
            fail_init: Arc::new(AtomicBool::new(false)),
            report_false: false,
            panic_on_init: false,
            unhealthy: false,
            subscribe: false,
            health_checks: Arc::new(AtomicUsize::new(0)),
            hold_init: Arc::new(AtomicBool::new(false)),
            release_init: Arc::new(Notify::new()),
            panic_on_stop_processing: false,
            shutdown_failure: None,
        }
    }

    fn failing(self) -> Self {
        self.fail_init.store(true, Ordering::SeqCst);
        self
    }

    fn reporting_false(mut self) -> Self {
        self.report_false = true;
        self
    }

    fn panicking(mut self) -> Self {
        self.panic_on_init = true;
        self
    }

    fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    fn subscribing(mut self) -> Self {
        self.subscribe = true;
        self
    }

    fn panicking_on_stop_processing(mut self) -> Self {
        self.panic_on_stop_processing = true;
        self
    }

    fn failing_shutdown(mut self, failure: ShutdownFailure) -> Self {
        self.shutdown_failure = Some(failure);
        self
    }
}

#[async_trait]
impl<const N: u8> Component for Stub<N> {
    fn name(&self) -> &str {
        self.state.name()
    }

    async fn initialize(&mut self) -> Result<bool, ComponentError> {
        self.journal.push(format!("init:{}", self.state.name()));
        if self.hold_init.load(Ordering::SeqCst) {
            self.release_init.notified().await;
        }
        if self.panic_on_init {
            panic!("stub {} exploded", self.state.name());
        }
        if self.fail_init.load(Ordering::SeqCst) {
            self.state.record_error("stub failure");
            return Err(ComponentError::Initialization("stub failure".to_string()));
        }
        if self.report_false {
            return Ok(false);
        }
        self.state.mark_ready();
        Ok(true)
    }

    async fn register_handlers(&mut self, bus: Arc<EventBus>) -> Result<(), ComponentError> {
        if self.subscribe {
            let id = bus.on(EventType::TextInput, self.state.name(), |_event: Event| async {
                Ok::<(), HandlerError>(())
            });
            self.state.track_subscription(id);
        }
        Ok(())
    }

    async fn stop_processing(&mut self) -> Result<(), ComponentError> {
        if self.panic_on_stop_processing {
            panic!("stub {} refused to stop", self.state.name());
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.journal.push(format!("stop:{}", self.state.name()));
        match self.shutdown_failure {
            Some(ShutdownFailure::Error) => {
                return Err(ComponentError::Shutdown("stub shutdown failure".to_string()))
            }
            Some(ShutdownFailure::Panic) => panic!("stub {} crashed on shutdown", self.state.name()),
            None => {}
        }
        self.state.mark_offline();
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthRecord, ComponentError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.unhealthy {
            return Err(ComponentError::HealthCheck("sensor offline".to_string()));
        }
        Ok(self.state.health_record())
    }

    fn status(&self) -> ComponentStatus {
        self.state.status()
    }
}

fn quiet_config() -> LifecycleConfig {
    LifecycleConfig {
        health_check_interval: Duration::from_secs(3600),
        health_check_timeout: Duration::from_secs(1),
        shutdown_timeout: Duration::from_secs(5),
    }
}

fn manager_with(config: LifecycleConfig) -> LifecycleManager {
    let bus = Arc::new(EventBus::new(BusConfig {
        workers: 1,
        ..BusConfig::default()
    }));
    LifecycleManager::new(bus, config)
}

fn manager() -> LifecycleManager {
    manager_with(quiet_config())
}

#[tokio::test]
async fn test_dependency_chain_starts_in_order_and_stops_in_reverse() {
    let journal = Journal::default();
    let manager = manager();

    // Registered deliberately in reverse of the expected startup order.
    manager
        .register(ComponentRegistration::new(Stub::<3>::new("z", &journal)).depends_on::<Stub<2>>())
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("y", &journal)).depends_on::<Stub<1>>())
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<1>::new("x", &journal)))
        .await
        .unwrap();

    manager.initialize().await.unwrap();

    assert_eq!(journal.with_prefix("init:"), vec!["x", "y", "z"]);
    assert_eq!(manager.initialization_order().await, vec!["x", "y", "z"]);
    assert_eq!(manager.system_phase().await, SystemPhase::Ready);
    assert!(manager.bus().is_running());
    for name in ["x", "y", "z"] {
        assert_eq!(manager.component_phase(name).await, Some(ComponentPhase::Ready));
    }

    manager.shutdown().await.unwrap();

    assert_eq!(journal.with_prefix("stop:"), vec!["z", "y", "x"]);
    assert_eq!(manager.system_phase().await, SystemPhase::Offline);
    assert!(!manager.bus().is_running());
    for name in ["x", "y", "z"] {
        assert_eq!(manager.component_phase(name).await, Some(ComponentPhase::Offline));
    }
}

#[tokio::test]
async fn test_cycle_fails_before_any_component_starts() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("a", &journal)).depends_on::<Stub<2>>())
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("b", &journal)).depends_on::<Stub<1>>())
        .await
        .unwrap();

    let result = manager.initialize().await;

    match result {
        Err(LifecycleError::CircularDependency { cycle }) => {
            assert!(cycle.contains(&"a".to_string()));
            assert!(cycle.contains(&"b".to_string()));
        }
        other => panic!("expected a circular dependency error, got {other:?}"),
    }
    assert!(journal.with_prefix("init:").is_empty());
    assert_eq!(manager.system_phase().await, SystemPhase::Error);
    assert_eq!(manager.component_phase("a").await, Some(ComponentPhase::Registered));

    // Cleanup after a failed start keeps the Error phase.
    manager.shutdown().await.unwrap();
    assert_eq!(manager.system_phase().await, SystemPhase::Error);
    assert!(journal.with_prefix("stop:").is_empty());
}

#[tokio::test]
async fn test_priority_then_registration_order_break_ties() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("late", &journal)).priority(5))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("first", &journal)).priority(1))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<3>::new("second", &journal)).priority(1))
        .await
        .unwrap();

    manager.initialize().await.unwrap();
    assert_eq!(journal.with_prefix("init:"), vec!["first", "second", "late"]);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dependency_overrides_priority() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(
            ComponentRegistration::new(Stub::<1>::new("eager", &journal))
                .priority(0)
                .depends_on::<Stub<2>>(),
        )
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("lazy", &journal)).priority(100))
        .await
        .unwrap();

    manager.initialize().await.unwrap();
    assert_eq!(journal.with_prefix("init:"), vec!["lazy", "eager"]);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_partial_failure_does_not_stop_startup() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("x", &journal)))
        .await
        .unwrap();
    manager
        .register(
            ComponentRegistration::new(Stub::<2>::new("y", &journal).failing())
                .depends_on::<Stub<1>>(),
        )
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<3>::new("z", &journal)))
        .await
        .unwrap();

    manager.initialize().await.unwrap();

    assert_eq!(manager.system_phase().await, SystemPhase::Ready);
    assert_eq!(manager.component_phase("x").await, Some(ComponentPhase::Ready));
    assert_eq!(manager.component_phase("y").await, Some(ComponentPhase::Error));
    assert_eq!(manager.component_phase("z").await, Some(ComponentPhase::Ready));

    let status = manager.get_component_status("y").await.unwrap();
    assert_eq!(status.error_count, 1);
    assert!(status.last_error.unwrap().contains("stub failure"));

    let report = manager.get_system_status().await;
    assert_eq!(report.total_components, 3);
    assert_eq!(report.components["y"].phase, ComponentPhase::Error);

    manager.shutdown().await.unwrap();
    assert_eq!(manager.system_phase().await, SystemPhase::Offline);
}

#[tokio::test]
async fn test_false_or_panicking_initialize_marks_error() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("quiet", &journal).reporting_false()))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("loud", &journal).panicking()))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<3>::new("fine", &journal)))
        .await
        .unwrap();

    manager.initialize().await.unwrap();

    assert_eq!(manager.component_phase("quiet").await, Some(ComponentPhase::Error));
    assert_eq!(manager.component_phase("loud").await, Some(ComponentPhase::Error));
    assert_eq!(manager.component_phase("fine").await, Some(ComponentPhase::Ready));
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_manual_component_starts_only_on_restart() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("auto", &journal)))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("manual", &journal)).auto_start(false))
        .await
        .unwrap();

    manager.initialize().await.unwrap();
    assert_eq!(journal.with_prefix("init:"), vec!["auto"]);
    assert_eq!(manager.component_phase("manual").await, Some(ComponentPhase::Registered));

    manager.restart_component("manual").await.unwrap();
    assert_eq!(manager.component_phase("manual").await, Some(ComponentPhase::Ready));
    assert_eq!(journal.with_prefix("init:"), vec!["auto", "manual"]);

    manager.shutdown().await.unwrap();
    assert_eq!(journal.with_prefix("stop:"), vec!["manual", "auto"]);
}

#[tokio::test]
async fn test_health_check_errors_are_recorded_without_phase_change() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("camera", &journal).unhealthy()))
        .await
        .unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("speaker", &journal)))
        .await
        .unwrap();
    manager.initialize().await.unwrap();

    let results = manager.perform_health_checks().await;
    assert_eq!(results.len(), 2);
    assert!(results["camera"].is_error());
    match &results["speaker"] {
        HealthStatus::Reported(record) => {
            assert_eq!(record.status, ComponentStatus::Ready);
            assert!(record.initialized);
        }
        other => panic!("expected a reported status, got {other:?}"),
    }

    assert_eq!(manager.component_phase("camera").await, Some(ComponentPhase::Ready));
    let status = manager.get_component_status("camera").await.unwrap();
    assert!(status.last_health_check.is_some());
    assert!(matches!(status.health_status, Some(HealthStatus::Error { .. })));

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_monitor_runs_periodically() {
    let journal = Journal::default();
    let manager = manager_with(LifecycleConfig {
        health_check_interval: Duration::from_millis(20),
        ..quiet_config()
    });

    let stub = Stub::<1>::new("sensor", &journal);
    let checks = stub.health_checks.clone();
    manager.register(ComponentRegistration::new(stub)).await.unwrap();
    manager.initialize().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while checks.load(Ordering::SeqCst) < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(checks.load(Ordering::SeqCst) >= 2);

    manager.shutdown().await.unwrap();
    let after_shutdown = checks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(checks.load(Ordering::SeqCst), after_shutdown);
}

#[tokio::test]
async fn test_restart_does_not_duplicate_subscriptions() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("listener", &journal).subscribing()))
        .await
        .unwrap();
    manager.initialize().await.unwrap();
    assert_eq!(manager.bus().get_component_subscriptions("listener").len(), 1);

    manager.restart_component("listener").await.unwrap();
    manager.restart_component("listener").await.unwrap();

    assert_eq!(manager.bus().get_component_subscriptions("listener").len(), 1);
    assert_eq!(journal.with_prefix("init:").len(), 3);
    assert_eq!(journal.with_prefix("stop:").len(), 2);
    assert_eq!(manager.initialization_order().await, vec!["listener"]);

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_restart_leaves_component_in_error() {
    let journal = Journal::default();
    let manager = manager();

    let stub = Stub::<1>::new("flaky", &journal).subscribing();
    let fail_switch = stub.fail_init.clone();
    manager.register(ComponentRegistration::new(stub)).await.unwrap();
    manager.initialize().await.unwrap();

    fail_switch.store(true, Ordering::SeqCst);
    let result = manager.restart_component("flaky").await;
    assert!(matches!(result, Err(LifecycleError::InitializationFailed(_))));
    assert_eq!(manager.component_phase("flaky").await, Some(ComponentPhase::Error));
    assert!(manager.bus().get_component_subscriptions("flaky").is_empty());

    fail_switch.store(false, Ordering::SeqCst);
    manager.restart_component("flaky").await.unwrap();
    assert_eq!(manager.component_phase("flaky").await, Some(ComponentPhase::Ready));
    assert_eq!(manager.bus().get_component_subscriptions("flaky").len(), 1);

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_restart_unknown_component() {
    let manager = manager();
    let result = manager.restart_component("ghost").await;
    assert_eq!(result, Err(LifecycleError::ComponentNotFound("ghost".to_string())));
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("twin", &journal)))
        .await
        .unwrap();
    let result = manager
        .register(ComponentRegistration::new(Stub::<2>::new("twin", &journal)))
        .await;

    assert_eq!(result, Err(LifecycleError::DuplicateComponent("twin".to_string())));
    assert_eq!(manager.component_count(), 1);
}

#[tokio::test]
async fn test_unregistered_dependency_is_ignored() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register_component(
            Stub::<1>::new("orphan", &journal),
            0,
            vec![crate::ComponentTypeRef::of::<Stub<9>>()],
            true,
        )
        .await
        .unwrap();

    manager.initialize().await.unwrap();
    assert_eq!(manager.component_phase("orphan").await, Some(ComponentPhase::Ready));
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_initialize_twice_is_rejected() {
    let manager = manager();
    manager.initialize().await.unwrap();

    assert_eq!(manager.initialize().await, Err(LifecycleError::AlreadyInitialized));

    manager.shutdown().await.unwrap();
    // A second shutdown is a no-op.
    manager.shutdown().await.unwrap();
    assert_eq!(manager.system_phase().await, SystemPhase::Offline);
}

#[tokio::test]
async fn test_panicking_stop_processing_does_not_block_shutdown() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("base", &journal)).priority(0))
        .await
        .unwrap();
    manager
        .register(
            ComponentRegistration::new(Stub::<2>::new("stubborn", &journal).panicking_on_stop_processing())
                .priority(1),
        )
        .await
        .unwrap();
    manager.initialize().await.unwrap();

    manager.shutdown().await.unwrap();

    assert_eq!(journal.with_prefix("stop:"), vec!["stubborn", "base"]);
    assert_eq!(manager.component_phase("base").await, Some(ComponentPhase::Offline));
    assert_eq!(manager.component_phase("stubborn").await, Some(ComponentPhase::Offline));
    assert_eq!(manager.system_phase().await, SystemPhase::Offline);
    assert!(!manager.bus().is_running());
}

#[tokio::test]
async fn test_failing_component_shutdowns_do_not_stop_the_sequence() {
    let journal = Journal::default();
    let manager = manager();

    manager
        .register(ComponentRegistration::new(Stub::<1>::new("a", &journal)).priority(0))
        .await
        .unwrap();
    manager
        .register(
            ComponentRegistration::new(Stub::<2>::new("b", &journal).failing_shutdown(ShutdownFailure::Error))
                .priority(1),
        )
        .await
        .unwrap();
    manager
        .register(
            ComponentRegistration::new(Stub::<3>::new("c", &journal).failing_shutdown(ShutdownFailure::Panic))
                .priority(2),
        )
        .await
        .unwrap();
    manager.initialize().await.unwrap();

    manager.shutdown().await.unwrap();

    assert_eq!(journal.with_prefix("stop:"), vec!["c", "b", "a"]);
    assert_eq!(manager.component_phase("c").await, Some(ComponentPhase::Error));
    assert_eq!(manager.component_phase("b").await, Some(ComponentPhase::Error));
    assert_eq!(manager.component_phase("a").await, Some(ComponentPhase::Offline));

    let status = manager.get_component_status("c").await.unwrap();
    assert!(status.last_error.unwrap().contains("panicked"));

    // Component failures are contained; only a broken sequence ends in Error.
    assert_eq!(manager.system_phase().await, SystemPhase::Offline);
    assert!(!manager.bus().is_running());
}

#[tokio::test]
async fn test_health_checks_do_not_wait_on_a_component_stuck_in_restart() {
    let journal = Journal::default();
    let manager = Arc::new(manager_with(LifecycleConfig {
        health_check_timeout: Duration::from_millis(50),
        ..quiet_config()
    }));

    let stuck = Stub::<1>::new("stuck", &journal);
    let hold = stuck.hold_init.clone();
    let release = stuck.release_init.clone();
    manager.register(ComponentRegistration::new(stuck).priority(0)).await.unwrap();
    manager
        .register(ComponentRegistration::new(Stub::<2>::new("steady", &journal)).priority(1))
        .await
        .unwrap();
    manager.initialize().await.unwrap();

    hold.store(true, Ordering::SeqCst);
    let restart = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.restart_component("stuck").await })
    };
    for _ in 0..200 {
        if journal.with_prefix("init:").len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(journal.with_prefix("init:"), vec!["stuck", "steady", "stuck"]);

    let statuses = tokio::time::timeout(Duration::from_secs(2), manager.perform_health_checks())
        .await
        .unwrap();
    match statuses.get("stuck") {
        Some(HealthStatus::Error { error, .. }) => assert!(error.contains("timed out")),
        other => panic!("expected a timed out check, got {other:?}"),
    }
    assert!(matches!(statuses.get("steady"), Some(HealthStatus::Reported(_))));

    hold.store(false, Ordering::SeqCst);
    release.notify_one();
    restart.await.unwrap().unwrap();
    assert_eq!(manager.component_phase("stuck").await, Some(ComponentPhase::Ready));

    manager.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_accept_exactly_one() {
    let journal = Journal::default();
    let manager = Arc::new(manager());

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let component = Stub::<1>::new("twin", &journal);
            tokio::spawn(async move { manager.register(ComponentRegistration::new(component)).await })
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(LifecycleError::DuplicateComponent(name)) => {
                assert_eq!(name, "twin");
                rejected += 1;
            }
            Err(other) => panic!("unexpected registration error: {other:?}"),
        }
    }

    assert_eq!((accepted, rejected), (1, 7));
    assert_eq!(manager.component_count(), 1);
}

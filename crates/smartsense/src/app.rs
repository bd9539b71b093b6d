//! Main application logic and lifecycle management.
//!
//! The `Application` owns the event bus and the lifecycle manager, registers
//! the collaborator components, feeds stdin into the text input component and
//! coordinates shutdown.

use crate::cli::CliArgs;
use crate::components::{
    NlpProcessor, TextInputHandle, TextInputHandler, TextOutputHandler, Transcript,
};
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::{wait_for_termination, wait_for_termination_silent, ShutdownSignal};
use component_system::{ComponentRegistration, LifecycleManager, SystemPhase};
use smartsense_bus::{create_event_bus, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Main application struct.
///
/// Holds the bus and the lifecycle manager as explicit context objects; the
/// components reach the bus only through the handle they are given.
pub struct Application {
    config: AppConfig,
    read_stdin: bool,
    bus: Arc<EventBus>,
    manager: Arc<LifecycleManager>,
    input: TextInputHandle,
    transcript: Transcript,
    shutdown: ShutdownSignal,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the application.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::load_config(&args).await?;
        Self::from_loaded(config, &args).await
    }

    /// Reads the configuration file named by `args` (creating it when
    /// missing) and applies the command-line overrides.
    pub async fn load_config(args: &CliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = &args.log_level {
            config.logging.level = log_level.clone();
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(workers) = args.workers {
            config.message_bus.workers = workers;
        }
        Ok(config)
    }

    /// Builds the application from a configuration produced by
    /// [`Application::load_config`].
    pub async fn from_loaded(
        config: AppConfig,
        args: &CliArgs,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        display_banner();
        Self::from_config(config, !args.no_stdin).await
    }

    /// Builds the application from an already loaded configuration.
    pub async fn from_config(
        config: AppConfig,
        read_stdin: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        let bus = create_event_bus(config.to_bus_config());
        let manager = Arc::new(LifecycleManager::new(
            Arc::clone(&bus),
            config.to_lifecycle_config(),
        ));

        let output = TextOutputHandler::new();
        let transcript = output.transcript();
        let nlp = NlpProcessor::new(&config.nlp);
        let input_handler =
            TextInputHandler::new(config.nlp.input_queue_size, config.nlp.max_input_length);
        let input = input_handler.handle();

        manager
            .register(ComponentRegistration::new(output).priority(10))
            .await?;
        manager
            .register(
                ComponentRegistration::new(nlp)
                    .priority(20)
                    .depends_on::<TextOutputHandler>(),
            )
            .await?;
        manager
            .register(
                ComponentRegistration::new(input_handler)
                    .priority(30)
                    .depends_on::<NlpProcessor>(),
            )
            .await?;

        Ok(Self {
            config,
            read_stdin,
            bus,
            manager,
            input,
            transcript,
            shutdown: ShutdownSignal::new(),
            background: Mutex::new(Vec::new()),
        })
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    /// Producer handle for the text input component.
    pub fn input(&self) -> &TextInputHandle {
        &self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Runs until a termination signal or the end of stdin, then shuts down.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!(
            "🌟 Starting {} v{}",
            self.config.app.name, self.config.app.version
        );
        self.log_configuration_summary();

        self.start().await?;

        {
            let shutdown = self.shutdown.clone();
            self.background.lock().await.push(tokio::spawn(async move {
                match wait_for_termination().await {
                    Ok(()) => shutdown.trigger("termination signal"),
                    Err(e) => error!("❌ Failed to install signal handlers: {e}"),
                }
            }));
        }

        info!("✅ SmartSense is now running!");
        if self.read_stdin {
            info!("⌨️ Type a message and press Enter ('quit' to exit)");
        }
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        self.shutdown.wait().await;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_termination_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        self.stop().await;

        info!("✅ SmartSense shutdown complete");
        info!("👋 Goodbye!");
        Ok(())
    }

    /// Initializes every component and starts the background tasks.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.manager.initialize().await?;

        let status = self.manager.get_system_status().await;
        info!(
            "🧭 Components started in order: [{}]",
            status.initialization_order.join(", ")
        );

        let mut background = self.background.lock().await;
        background.push(spawn_monitor(Arc::clone(&self.bus)));
        if self.read_stdin {
            background.push(spawn_stdin_reader(self.input.clone(), self.shutdown.clone()));
        }
        Ok(())
    }

    /// Stops background tasks, then shuts components down in reverse order
    /// within the configured shutdown timeout.
    pub async fn stop(&self) {
        self.shutdown.trigger("application stop");

        info!("📡 Phase 1: Stopping input and monitoring...");
        for task in self.background.lock().await.drain(..) {
            task.abort();
        }

        info!("🔌 Phase 2: Shutting down components...");
        let timeout = self.manager.config().shutdown_timeout;
        match tokio::time::timeout(timeout, self.manager.shutdown()).await {
            Ok(Ok(())) => info!("✅ Component shutdown completed"),
            Ok(Err(e)) => error!("❌ Component shutdown failed: {}", e),
            Err(_) => {
                warn!("⏰ Shutdown did not finish within {:?}; stopping the bus", timeout);
                self.bus.shutdown().await;
            }
        }

        log_final_statistics(&self.bus, self.manager.system_phase().await);
    }

    fn log_configuration_summary(&self) {
        let bus = &self.config.message_bus;
        info!("📋 Configuration Summary:");
        info!(
            "  📨 Queues: {} normal / {} high priority (threshold > {})",
            bus.max_queue_size, bus.priority_queue_size, bus.priority_threshold
        );
        info!("  👷 Dispatch workers: {}", bus.workers);
        info!(
            "  ⏱️ Processing timeout: {}ms | retries: {}",
            bus.processing_timeout_ms, bus.retry_attempts
        );
        info!(
            "  🩺 Health checks every {}s",
            self.config.lifecycle.health_check_interval_secs
        );
        info!("  🔎 NLP intents: {}", self.config.nlp.intents.len());
    }
}

fn spawn_monitor(bus: Arc<EventBus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MONITOR_INTERVAL);
        interval.tick().await;
        let mut last_published = 0u64;

        loop {
            interval.tick().await;

            let stats = bus.get_statistics();
            let published = stats.statistics.events_published;
            let this_period = published.saturating_sub(last_published);
            last_published = published;

            info!(
                "📊 System Health - {} events/min | {} processed | {} failed | {} dropped | queues {}/{}",
                this_period,
                stats.statistics.events_processed,
                stats.statistics.events_failed,
                stats.statistics.events_dropped,
                stats.queue_sizes.regular,
                stats.queue_sizes.priority
            );
        }
    })
}

fn spawn_stdin_reader(input: TextInputHandle, shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let command = line.trim().to_lowercase();
                    if matches!(command.as_str(), "quit" | "exit" | "q") {
                        shutdown.trigger("quit command");
                        break;
                    }
                    if command.is_empty() {
                        continue;
                    }
                    if let Err(e) = input.submit(&line) {
                        warn!("⚠️ Input rejected: {}", e);
                    }
                }
                Ok(None) => {
                    shutdown.trigger("end of input");
                    break;
                }
                Err(e) => {
                    error!("❌ Failed to read stdin: {}", e);
                    shutdown.trigger("stdin error");
                    break;
                }
            }
        }
    })
}

/// Logs final statistics during shutdown.
fn log_final_statistics(bus: &EventBus, phase: SystemPhase) {
    let stats = bus.get_statistics();
    info!("📊 Final Statistics:");
    info!("  - System phase: {}", phase);
    info!("  - Uptime: {:.1}s", stats.uptime_seconds);
    info!("  - Events published: {}", stats.statistics.events_published);
    info!("  - Events processed: {}", stats.statistics.events_processed);
    info!("  - Events failed: {}", stats.statistics.events_failed);
    info!("  - Events dropped: {}", stats.statistics.events_dropped);
    info!("  - Events in history: {}", stats.history_size);
}

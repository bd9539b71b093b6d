//! # SmartSense Assistant - Main Entry Point
//!
//! Event-driven text assistant. Lines typed on stdin become `text_input_event`s
//! on the message bus, the NLP component classifies them and answers with a
//! `display_text_event`, and the output component renders the reply. All
//! components are started in dependency order and stopped in reverse.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (created on first start)
//! smartsense
//!
//! # Specify a configuration file and more dispatch workers
//! smartsense --config assistant.toml --workers 8
//!
//! # Headless: no stdin, JSON logs, stop with Ctrl+C
//! smartsense --no-stdin --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! The assistant shuts down gracefully on SIGINT (Ctrl+C), SIGTERM (Unix),
//! `quit` on stdin or the end of stdin. A second signal exits immediately.

use tracing::error;

mod app;
mod cli;
pub mod components;
pub mod config;
mod logging;
pub mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, IntentRule, LoggingSettings, MessageBusSettings, NlpSettings};

/// Runs the assistant: CLI parsing, configuration, logging, then the
/// application until shutdown.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging is configured from the file, so it is not up yet
    let config = match Application::load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load configuration from {}: {e}",
                args.config_path.display()
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::from_loaded(config, &args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

//! Logging system setup and configuration.
//!
//! Initializes the tracing-based logging system with either human-readable or
//! JSON output.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the configured level when set. The
/// `json_format` flag forces JSON output regardless of the config file.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(fmt::layer()
                .json()
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║          🧠 SMARTSENSE ASSISTANT 🧠       ║");
    info!("║                 v{}                  ║", version);
    info!("║                                          ║");
    info!("║  💬 Text In  →  🔎 NLP  →  🖥️  Text Out    ║");
    info!("║  📨 Async Message Bus                    ║");
    info!("║  🧭 Dependency-Ordered Lifecycle         ║");
    info!("╚══════════════════════════════════════════╝");
}

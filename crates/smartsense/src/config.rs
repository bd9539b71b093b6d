//! Configuration management for the SmartSense assistant.
//!
//! This module handles loading, validation, and conversion of the application
//! configuration from TOML files into the bus and lifecycle settings.

use component_system::LifecycleConfig;
use serde::{Deserialize, Serialize};
use smartsense_bus::BusConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn default_app_name() -> String {
    "SmartSense".to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

fn default_max_queue_size() -> usize { 1000 }
fn default_priority_queue_size() -> usize { 250 }
fn default_priority_threshold() -> i32 { 5 }
fn default_processing_timeout_ms() -> u64 { 30_000 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 100 }
fn default_workers() -> usize { 4 }
fn default_history_size() -> usize { 1000 }

fn default_health_check_interval_secs() -> u64 { 60 }
fn default_health_check_timeout_secs() -> u64 { 10 }
fn default_shutdown_timeout_secs() -> u64 { 30 }

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_input_length() -> usize { 4000 }
fn default_input_queue_size() -> usize { 100 }

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub message_bus: MessageBusSettings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub nlp: NlpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
    #[serde(default)]
    pub debug: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            debug: false,
        }
    }
}

/// Event bus settings. Durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBusSettings {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_priority_queue_size")]
    pub priority_queue_size: usize,
    /// Events with a priority above this go to the high-priority queue
    #[serde(default = "default_priority_threshold")]
    pub priority_threshold: i32,
    #[serde(default = "default_processing_timeout_ms")]
    pub processing_timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for MessageBusSettings {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            priority_queue_size: default_priority_queue_size(),
            priority_threshold: default_priority_threshold(),
            processing_timeout_ms: default_processing_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            workers: default_workers(),
            history_size: default_history_size(),
        }
    }
}

/// Lifecycle manager timing, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            health_check_interval_secs: default_health_check_interval_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

/// One intent and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl IntentRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Text analysis settings.
///
/// Intents are tried in file order; the first one with a matching keyword wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpSettings {
    /// Matches scoring below this are reported as `unknown`
    #[serde(default)]
    pub confidence_threshold: f64,
    /// Longer input is truncated before it is published
    #[serde(default = "default_max_input_length")]
    pub max_input_length: usize,
    #[serde(default = "default_input_queue_size")]
    pub input_queue_size: usize,
    #[serde(default = "default_intents")]
    pub intents: Vec<IntentRule>,
}

fn default_intents() -> Vec<IntentRule> {
    vec![
        IntentRule::new("greeting", &["hello", "hi", "hey", "good morning", "good evening"]),
        IntentRule::new("goodbye", &["bye", "goodbye", "see you", "farewell"]),
        IntentRule::new("question", &["what", "how", "why", "when", "where", "who"]),
        IntentRule::new("command", &["open", "close", "start", "stop", "launch", "exit"]),
        IntentRule::new("help", &["help", "assist", "support", "guide"]),
    ]
}

impl Default for NlpSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.0,
            max_input_length: default_max_input_length(),
            input_queue_size: default_input_queue_size(),
            intents: default_intents(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating a default one if missing.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn to_bus_config(&self) -> BusConfig {
        let bus = &self.message_bus;
        BusConfig {
            max_queue_size: bus.max_queue_size,
            priority_queue_size: bus.priority_queue_size,
            priority_threshold: bus.priority_threshold,
            processing_timeout: Duration::from_millis(bus.processing_timeout_ms),
            retry_attempts: bus.retry_attempts,
            retry_base_delay: Duration::from_millis(bus.retry_base_delay_ms),
            workers: bus.workers,
            history_size: bus.history_size,
            ..BusConfig::with_queue_size(bus.max_queue_size)
        }
    }

    pub fn to_lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            health_check_interval: Duration::from_secs(self.lifecycle.health_check_interval_secs),
            health_check_timeout: Duration::from_secs(self.lifecycle.health_check_timeout_secs),
            shutdown_timeout: Duration::from_secs(self.lifecycle.shutdown_timeout_secs),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let bus = &self.message_bus;

        if !(1..=10_000).contains(&bus.max_queue_size) {
            return Err(format!(
                "message_bus.max_queue_size must be between 1 and 10000, got {}",
                bus.max_queue_size
            ));
        }
        if bus.priority_queue_size == 0 {
            return Err("message_bus.priority_queue_size must be greater than 0".to_string());
        }
        if !(1_000..=300_000).contains(&bus.processing_timeout_ms) {
            return Err(format!(
                "message_bus.processing_timeout_ms must be between 1000 and 300000, got {}",
                bus.processing_timeout_ms
            ));
        }
        if bus.retry_attempts > 10 {
            return Err(format!(
                "message_bus.retry_attempts must be at most 10, got {}",
                bus.retry_attempts
            ));
        }
        if bus.workers == 0 {
            return Err("message_bus.workers must be greater than 0".to_string());
        }
        if bus.history_size == 0 {
            return Err("message_bus.history_size must be greater than 0".to_string());
        }

        if self.lifecycle.health_check_interval_secs == 0 {
            return Err("lifecycle.health_check_interval_secs must be greater than 0".to_string());
        }
        if self.lifecycle.health_check_timeout_secs == 0 {
            return Err("lifecycle.health_check_timeout_secs must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if !(0.0..=1.0).contains(&self.nlp.confidence_threshold) {
            return Err("nlp.confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.nlp.max_input_length == 0 || self.nlp.input_queue_size == 0 {
            return Err("nlp.max_input_length and nlp.input_queue_size must be greater than 0".to_string());
        }
        if let Some(rule) = self.nlp.intents.iter().find(|rule| rule.keywords.is_empty()) {
            return Err(format!("nlp intent '{}' has no keywords", rule.name));
        }

        Ok(())
    }
}

//! Command-line interface handling for the SmartSense assistant.
//!
//! This module provides command-line argument parsing using the `clap` crate.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option except the config path overrides a value from the
/// configuration file.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the number of bus dispatch workers
    pub workers: Option<usize>,
    /// Run without reading stdin, until a termination signal arrives
    pub no_stdin: bool,
}

fn command() -> Command {
    Command::new("SmartSense Assistant")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Event-driven text assistant built on an async message bus")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("COUNT")
                .help("Number of event dispatch workers")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-stdin")
                .long("no-stdin")
                .help("Do not read input from stdin; run until Ctrl+C")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments. Exits with usage help on invalid input.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            workers: matches.get_one::<usize>("workers").copied(),
            no_stdin: matches.get_flag("no-stdin"),
        }
    }
}

//! Application configuration loading, validation, and management.
//!
//! The top-level `Config` aggregates logging, serial, telemetry, and
//! transport settings. It loads from a TOML file located via the
//! `THERMBRIDGE_CONFIG` environment variable or `/etc/thermbridge/config.toml`,
//! and falls back to built-in defaults when neither exists; every setting
//! has a default matching the conventional bridge deployment (local broker,
//! `/dev/ttyACM0` at 9600 baud).
//!
//! Configuration is loaded once at startup and immutable thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{logger::LoggerConfig, serial::SerialConfig, telemetry::TelemetryConfig};

pub mod logger;
pub mod serial;
pub mod telemetry;

/// Simple macros for printing timestamped messages before the tracing
/// subscriber is initialized. Used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur during configuration loading, parsing, or
/// validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while accessing the configuration file.
    #[error("IO error while reading configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    Parse(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Serial source configuration (device path, baud rate, retry delay).
    #[validate(nested)]
    pub serial: SerialConfig,

    /// Telemetry endpoint: topic, QoS, and retain flag for readings.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// MQTT transport configuration.
    #[validate(nested)]
    pub transport: thermbridge_mqtt::MqttConfig,
}

impl Config {
    /// Constructs the configuration by locating and loading the config
    /// file, or from defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a file was found but cannot be read,
    /// parsed, or validated. A missing file is not an error.
    pub fn new() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) => Self::load(&path),
            None => {
                print_warn!("No configuration file found, using built-in defaults");
                Ok(Config::default())
            }
        }
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `THERMBRIDGE_CONFIG` environment variable
    /// 2. `/etc/thermbridge/config.toml`
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("THERMBRIDGE_CONFIG") {
            let path = PathBuf::from(config_path);
            print_info!("Using config from THERMBRIDGE_CONFIG: {}", path.display());
            return Some(path);
        }

        let fallback = Path::new("/etc/thermbridge/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Some(fallback.to_path_buf());
        }

        None
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        let config_str = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }
}

//! Configuration management for routewatch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting a JSON config file, environment variables, and defaults.
//!
//! The connection settings live at the top level of the file so that a plain
//! `mikrotik_config.json` holding only `host`, `username`, `password`, and
//! `port` is a complete, valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::detect::builtin_keywords;
use crate::error::{Error, Result};

/// Default configuration file name, looked up in the working directory.
const CONFIG_FILE_NAME: &str = "mikrotik_config.json";

/// Default master CSV file name.
const LEDGER_FILE_NAME: &str = "failed_logins_master.csv";

/// Default RouterOS API port.
const DEFAULT_API_PORT: u16 = 8728;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROUTEWATCH_`)
/// 2. JSON config file at `./mikrotik_config.json`
/// 3. Default values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Router hostname or IP address.
    pub host: String,
    /// API username.
    pub username: String,
    /// API password.
    pub password: String,
    /// API port.
    pub port: u16,
    /// Timeout for connecting to and reading from the router, in seconds.
    pub timeout_secs: u64,
    /// Detection configuration.
    pub detection: DetectionConfig,
    /// Output configuration.
    pub output: OutputConfig,
    /// Watch-mode configuration.
    pub watch: WatchConfig,
}

/// Detection-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Substrings that mark a log message as a failed login
    /// (matched case-insensitively).
    pub failure_keywords: Vec<String>,
    /// Additional regex patterns that mark a message as a failed login.
    pub extra_patterns: Vec<String>,
    /// Number of attempts from one address that triggers a brute-force alert.
    pub brute_force_threshold: usize,
    /// Window within which the attempts must fall, in minutes.
    pub brute_force_window_minutes: u32,
}

/// Output-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the master CSV ledger.
    pub csv_path: PathBuf,
    /// Directory where report and alert files are written.
    pub report_dir: PathBuf,
    /// Write per-pass report and alert files.
    pub write_reports: bool,
    /// Open freshly written reports in the platform's default viewer.
    pub open_reports: bool,
}

/// Watch-mode configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between polling passes.
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            port: DEFAULT_API_PORT,
            timeout_secs: 10,
            detection: DetectionConfig::default(),
            output: OutputConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            failure_keywords: builtin_keywords()
                .iter()
                .map(|k| k.needle().to_string())
                .collect(),
            extra_patterns: Vec::new(),
            brute_force_threshold: 2,
            brute_force_window_minutes: 5,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(LEDGER_FILE_NAME),
            report_dir: PathBuf::from("."),
            write_reports: true,
            open_reports: false, // Opt-in; watch mode would open a window per pass
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. JSON config file (if it exists)
    /// 3. Environment variables (prefixed with `ROUTEWATCH_`; nested section
    ///    keys use a double underscore, e.g. `ROUTEWATCH_WATCH__INTERVAL_SECS`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Json::file(&config_file))
            // Double underscore separates nesting levels, so multi-word keys
            // like TIMEOUT_SECS stay addressable: ROUTEWATCH_TIMEOUT_SECS is
            // top-level, ROUTEWATCH_WATCH__INTERVAL_SECS reaches a section.
            .merge(Env::prefixed("ROUTEWATCH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config_validation("host must not be empty"));
        }

        if self.port == 0 {
            return Err(Error::config_validation("port must be greater than 0"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::config_validation(
                "timeout_secs must be greater than 0",
            ));
        }

        if self.detection.brute_force_threshold == 0 {
            return Err(Error::config_validation(
                "brute_force_threshold must be greater than 0",
            ));
        }

        if self.detection.brute_force_window_minutes == 0 {
            return Err(Error::config_validation(
                "brute_force_window_minutes must be greater than 0",
            ));
        }

        if self.watch.interval_secs == 0 {
            return Err(Error::config_validation(
                "interval_secs must be greater than 0",
            ));
        }

        // Validate regex patterns
        for pattern in &self.detection.extra_patterns {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid regex pattern: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// The `host:port` address of the router's API service.
    #[must_use]
    pub fn router_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the router timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the watch interval as a Duration.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }

    /// Get the brute-force window as a chrono Duration.
    #[must_use]
    pub fn brute_force_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.detection.brute_force_window_minutes))
    }
}

//! Configuration management for the SR-IOV exporter.
//!
//! Supports loading configuration from:
//! - TOML configuration files
//! - Environment variables (with `SRIOVNET_EXPORTER_` prefix)
//! - Command-line arguments

use crate::error::{Result, SriovError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Directory under which `/sys` is found ("/" on the host itself)
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: String,

    /// Metric namespace, the first part of every metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Driver whose stat reader is used for PFs bound to a driver without one
    #[serde(default)]
    pub fallback_driver: Option<String>,
}

/// Exporter specific settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterConfig {
    /// Address to listen on for metrics endpoint
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (text, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Main configuration structure for the SR-IOV exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Collector configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Exporter server configuration
    #[serde(default)]
    pub exporter: ExporterConfig,
}

fn default_sysfs_root() -> String {
    "/".to_string()
}

fn default_namespace() -> String {
    "node".to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0:9808".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            namespace: default_namespace(),
            fallback_driver: None,
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn invalid(message: &str) -> SriovError {
    SriovError::Config(config::ConfigError::Message(message.to_string()))
}

fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl Settings {
    /// Load configuration from a file and environment variables.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to configuration file
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sriovnet_exporter::config::Settings;
    ///
    /// let settings = Settings::load(Some("config/default.toml")).unwrap();
    /// ```
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Add config file if provided
        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        // Add environment variables with SRIOVNET_EXPORTER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("SRIOVNET_EXPORTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration settings.
    pub fn validate(&self) -> Result<()> {
        if self.exporter.listen_address.is_empty() {
            return Err(invalid("listen address cannot be empty"));
        }

        if self.collector.sysfs_root.is_empty() {
            return Err(invalid("sysfs root cannot be empty"));
        }

        if !is_valid_namespace(&self.collector.namespace) {
            return Err(invalid(
                "metric namespace must match [a-zA-Z_][a-zA-Z0-9_]*",
            ));
        }

        if !matches!(self.exporter.log_format.as_str(), "text" | "json") {
            return Err(invalid("log format must be \"text\" or \"json\""));
        }

        Ok(())
    }
}

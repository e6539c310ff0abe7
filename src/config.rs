//! YAML application configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup: stdout logging at `info`, metrics on `0.0.0.0:9898`,
//! collected every 10 seconds.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::ServerOptions;

pub const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9898";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "PAC Metrics".to_string(),
            version: "1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub output: LogOutput,
    /// Directory for rolling log files when `output` is `file`.
    pub dir: String,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            dir: "logs".to_string(),
            file_prefix: "pac-metrics.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
    pub collect_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: DEFAULT_METRICS_ADDR.to_string(),
            collect_interval_secs: DEFAULT_COLLECT_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Load and validate the config at `path`; a missing file is an error.
    pub fn load_required(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null rather than an empty mapping.
        let config: AppConfig = if raw.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.collect_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "metrics.collect_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.metrics.enabled && self.metrics.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "metrics.listen_addr must be set when metrics are enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_server_options(&self) -> ServerOptions {
        ServerOptions {
            service_name: self.service.name.clone(),
            service_version: self.service.version.clone(),
            metrics_enabled: self.metrics.enabled,
            metrics_addr: self.metrics.listen_addr.clone(),
            collect_interval: Duration::from_secs(self.metrics.collect_interval_secs),
        }
    }
}

//! Configuration loading from TOML files
//!
//! Config file is selected via `--config <path>` (default: config/dev.toml).
//! Every section is optional; missing keys take the defaults below.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { name: default_service_name() }
    }
}

fn default_service_name() -> String {
    "geofence_event_processing".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request bodies larger than this are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZonesConfig {
    /// JSON zone file path
    #[serde(default = "default_zones_file")]
    pub file: String,
    /// Use the builtin zones when the file is missing (never when invalid)
    #[serde(default = "default_fallback_to_builtin")]
    pub fallback_to_builtin: bool,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self { file: default_zones_file(), fallback_to_builtin: default_fallback_to_builtin() }
    }
}

fn default_zones_file() -> String {
    "zones.json".to_string()
}

fn default_fallback_to_builtin() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Transitions kept per vehicle (0 = unbounded)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { history_limit: default_history_limit() }
    }
}

fn default_history_limit() -> usize {
    crate::services::vehicle_store::DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval between metrics log lines (0 to disable)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    service_name: String,
    bind_address: String,
    port: u16,
    max_body_bytes: usize,
    zones_file: String,
    zones_fallback_to_builtin: bool,
    history_limit: usize,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            service_name: toml_config.service.name,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            max_body_bytes: toml_config.server.max_body_bytes,
            zones_file: toml_config.zones.file,
            zones_fallback_to_builtin: toml_config.zones.fallback_to_builtin,
            history_limit: toml_config.state.history_limit,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).context("Failed to parse config")?;
        Ok(Self::from_toml(toml_config, "inline".to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Override the zone file path (command line takes precedence)
    pub fn with_zones_file(mut self, file: impl Into<String>) -> Self {
        self.zones_file = file.into();
        self
    }

    /// Override the listen port (command line takes precedence)
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Listen address from `bind_address` and `port`. Accepts IPv4 and IPv6.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind_address.trim().parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn zones_file(&self) -> &str {
        &self.zones_file
    }

    pub fn zones_fallback_to_builtin(&self) -> bool {
        self.zones_fallback_to_builtin
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

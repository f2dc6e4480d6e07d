use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::dns::DnsConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::routing::RoutingConfig;
use super::server::ServerConfig;

const LOCAL_CONFIG: &str = "traffic-router.toml";
const SYSTEM_CONFIG: &str = "/etc/traffic-router/config.toml";

/// Main configuration structure for the traffic router
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (port, bind address)
    #[serde(default)]
    pub server: ServerConfig,

    /// DNS executor and transport limits
    #[serde(default)]
    pub dns: DnsConfig,

    /// Snapshot and lookup data files
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. traffic-router.toml in current directory
    /// 3. /etc/traffic-router/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new(LOCAL_CONFIG).exists() {
            Self::from_file(LOCAL_CONFIG)?
        } else if std::path::Path::new(SYSTEM_CONFIG).exists() {
            Self::from_file(SYSTEM_CONFIG)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(snapshot) = overrides.snapshot_path {
            self.routing.snapshot_path = snapshot;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::invalid("server", "dns_port cannot be 0"));
        }
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::invalid(
                "server",
                format!("bind_address '{}' is not an IP address", self.server.bind_address),
            ));
        }
        if self.dns.worker_threads == 0 {
            return Err(ConfigError::invalid("dns", "worker_threads must be at least 1"));
        }
        if self.dns.task_timeout_ms == 0 {
            return Err(ConfigError::invalid("dns", "task_timeout_ms must be greater than 0"));
        }
        if self.routing.snapshot_path.is_empty() {
            return Err(ConfigError::invalid("routing", "snapshot_path is required"));
        }
        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub snapshot_path: Option<String>,
    pub log_level: Option<String>,
}

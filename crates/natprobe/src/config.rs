//! Detector configuration.

use crate::error::ConfigError;
use crate::exchange::ExchangeConfig;
use crate::selector::{DEFAULT_STUN_SERVERS, ServerPool};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

/// Default STUN server port
pub const DEFAULT_STUN_PORT: u16 = 3478;

/// Default local port
pub const DEFAULT_SOURCE_PORT: u16 = 54320;

/// NAT detector configuration
///
/// Every field has a default, so an empty TOML document is valid:
///
/// ```toml
/// stun_host = "stun.example.org"   # skip server selection
/// stun_port = 3478
/// source_ip = "192.168.1.20"
/// source_port = 54320
/// attempt_timeout_ms = 1000
/// retries = 3
/// servers = ["stun.example.org", "stun.example.net"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Explicit STUN host; when unset the server pool is probed in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stun_host: Option<String>,
    /// STUN server port
    #[serde(default = "default_stun_port")]
    pub stun_port: u16,
    /// Local address to bind and compare against
    #[serde(default = "default_source_ip")]
    pub source_ip: Ipv4Addr,
    /// Local port to bind
    #[serde(default = "default_source_port")]
    pub source_port: u16,
    /// Wait per attempt, in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Resends after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Candidate STUN hosts, tried in order
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
}

// Default values

fn default_stun_port() -> u16 {
    DEFAULT_STUN_PORT
}

fn default_source_ip() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_source_port() -> u16 {
    DEFAULT_SOURCE_PORT
}

fn default_attempt_timeout_ms() -> u64 {
    1000
}

fn default_retries() -> u32 {
    3
}

fn default_servers() -> Vec<String> {
    DEFAULT_STUN_SERVERS.iter().map(ToString::to_string).collect()
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            stun_host: None,
            stun_port: default_stun_port(),
            source_ip: default_source_ip(),
            source_port: default_source_port(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            retries: default_retries(),
            servers: default_servers(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero timeout, or for an empty
    /// server pool when no explicit host is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "attempt_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.stun_host.is_none() && self.servers.is_empty() {
            return Err(ConfigError::Invalid(
                "servers must not be empty when stun_host is unset".to_string(),
            ));
        }
        if self.servers.iter().any(|host| host.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "servers must not contain empty host names".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-exchange retry settings
    #[must_use]
    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            retries: self.retries,
        }
    }

    /// Candidate servers for selection
    #[must_use]
    pub fn server_pool(&self) -> ServerPool {
        ServerPool::new(self.servers.clone())
    }
}

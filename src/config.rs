//! Server configuration
//!
//! Defaults, overridable from a TOML file and then from the command line.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

/// Default listen port
pub const DEFAULT_PORT: u16 = 9001;

/// Runtime settings for the chat server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to listen on
    pub host: String,
    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Longest inbound line accepted, in bytes
    pub max_line_length: usize,
    /// Per-session outbound queue capacity
    pub outbound_queue: usize,
    /// How long shutdown waits for sessions before closing them
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_line_length: 8192,
            outbound_queue: 32,
            shutdown_grace_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_line_length == 0 {
            return Err(AppError::InvalidConfig(
                "max_line_length must be greater than 0".to_string(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(AppError::InvalidConfig(
                "outbound_queue must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown grace period
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// How long a finished session waits for its writer to flush
    ///
    /// Half the grace period, so a session stuck on a client that stopped
    /// reading gives up on its own before the server aborts it.
    pub fn drain_timeout(&self) -> Duration {
        self.shutdown_grace() / 2
    }
}

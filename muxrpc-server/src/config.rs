//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via MUXRPC_CONFIG)
//! 3. Environment variables

use muxrpc_protocol::{DEFAULT_PORT, MAX_FRAME_SIZE};
use muxrpc_transport::tcp::DEFAULT_READ_BUFFER_SIZE;
use serde::{Deserialize, Deserializer};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Framing configuration for accepted connections.
    pub transport: TransportConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MUXRPC_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.transport.apply_env_overrides();
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(deserialize_with = "parse_socket_addr")]
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            max_connections: 1000,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("MUXRPC_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(max) = std::env::var("MUXRPC_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }
}

/// Framing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest frame accepted or sent, in bytes.
    pub max_frame_size: u32,
    /// Socket read buffer size, in bytes.
    pub read_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl TransportConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("MUXRPC_MAX_FRAME_SIZE") {
            if let Ok(n) = size.parse() {
                self.max_frame_size = n;
            }
        }

        if let Ok(size) = std::env::var("MUXRPC_READ_BUFFER_SIZE") {
            if let Ok(n) = size.parse() {
                self.read_buffer_size = n;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {1}", path = .0.display())]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{path}': {1}", path = .0.display())]
    ParseError(PathBuf, String),
}

/// Reads a `SocketAddr` written as a plain string.
fn parse_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.bind_addr.port(), 7501);
        assert_eq!(config.network.max_connections, 1000);
        assert_eq!(config.transport.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(config.transport.read_buffer_size, 8 * 1024);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "network:\n  bind_addr: \"0.0.0.0:9000\"\ntransport:\n  max_frame_size: 4096").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.network.max_connections, 1000);
        assert_eq!(config.transport.max_frame_size, 4096);
        assert_eq!(config.transport.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::IoError(_, _))
        ));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "network:\n  bind_addr: not-an-address\n").unwrap();
        let err = Config::from_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_, _)));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_from_file_connection_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muxrpc.yaml");
        std::fs::write(&path, "network:\n  max_connections: 8\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.network.max_connections, 8);
        assert_eq!(config.network.bind_addr, Config::default().network.bind_addr);
    }
}

//! Client configuration
//!
//! Defaults match the reference deployment; everything can be overridden
//! from a TOML file or by mutating the struct before constructing the
//! client.

use crate::{ClientError, Result};
use dca_protocol::DEFAULT_SOCKET_PATH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`crate::DcaClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Path of the server's Unix socket
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// How long to wait when opening a connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Optional whole-round-trip timeout, in seconds. Unset means a call
    /// waits for its response indefinitely. When a round trip does time
    /// out, the connection is considered compromised and must be reopened:
    /// the late response could otherwise be misread as the answer to a
    /// later request.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// How long a direct-socket handshake may take, in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: None,
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ClientError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Override the socket path, keeping other settings
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.socket_path, PathBuf::from("/var/tmp/dcaserver.sock"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            "socket_path = \"/run/dca/server.sock\"\nrequest_timeout_secs = 30\n",
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/run/dca/server.sock"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        // Unspecified fields fall back to defaults
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load(Path::new("/nonexistent/client.toml")).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(&path, "socket_path = [not toml").unwrap();

        let err = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_with_socket_path() {
        let config = ClientConfig::default().with_socket_path("/tmp/alt.sock");
        assert_eq!(config.socket_path, PathBuf::from("/tmp/alt.sock"));
    }
}

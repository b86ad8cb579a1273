//! Synchronizer configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use votesync_types::Address;

use crate::{LogFormat, SyncError};

/// Configuration for the synchronizer and the read API around it.
///
/// Can be loaded from a TOML file via [`IndexerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// JSON-RPC endpoint of the ledger node.
    #[serde(default)]
    pub rpc_http_url: String,

    /// Pub-sub endpoint. Derived from `rpc_http_url` when empty.
    #[serde(default)]
    pub rpc_ws_url: String,

    /// Base58 address of the voting program.
    #[serde(default)]
    pub program_id: String,

    /// Data directory for the LMDB mirror.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Capacity of the channel between the stream tasks and the
    /// reconciliation worker.
    #[serde(default = "default_ingest_capacity")]
    pub ingest_capacity: usize,

    /// Whether to serve the read API.
    #[serde(default = "default_true")]
    pub enable_api: bool,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Origins allowed by CORS on the read API.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./votesync_data")
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_ingest_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl IndexerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, SyncError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SyncError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SyncError> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SyncError> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// The pub-sub URL: `rpc_ws_url` if set, else the HTTP URL with its
    /// scheme swapped (`https` to `wss`, `http` to `ws`).
    pub fn ws_url(&self) -> String {
        if !self.rpc_ws_url.is_empty() {
            return self.rpc_ws_url.clone();
        }
        if let Some(rest) = self.rpc_http_url.strip_prefix("https") {
            format!("wss{rest}")
        } else if let Some(rest) = self.rpc_http_url.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            self.rpc_http_url.clone()
        }
    }

    pub fn program_address(&self) -> Result<Address, SyncError> {
        self.program_id
            .parse()
            .map_err(|e| SyncError::Config(format!("invalid program_id: {e}")))
    }

    /// Check the settings that have no usable default.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.rpc_http_url.is_empty() {
            return Err(SyncError::Config("missing rpc_http_url".to_string()));
        }
        if self.program_id.is_empty() {
            return Err(SyncError::Config("missing program_id".to_string()));
        }
        self.program_address()?;
        if self.ingest_capacity == 0 {
            return Err(SyncError::Config("ingest_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rpc_http_url: String::new(),
            rpc_ws_url: String::new(),
            program_id: String::new(),
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            ingest_capacity: default_ingest_capacity(),
            enable_api: default_true(),
            api_port: default_api_port(),
            cors_origins: default_cors_origins(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs";

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = IndexerConfig::from_toml_str("").unwrap();
        assert_eq!(config.api_port, 3000);
        assert_eq!(config.ingest_capacity, 1024);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.enable_api);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            rpc_http_url = "https://api.devnet.solana.com"
            program_id = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs"
            log_format = "json"
            api_port = 8080
        "#;
        let config = IndexerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        config.validate().unwrap();
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = IndexerConfig::default();
        let parsed = IndexerConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed.api_port, config.api_port);
        assert_eq!(parsed.cors_origins, config.cors_origins);
    }

    #[test]
    fn ws_url_is_derived_from_http_scheme() {
        let mut config = IndexerConfig {
            rpc_http_url: "https://api.devnet.solana.com".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_url(), "wss://api.devnet.solana.com");
        config.rpc_http_url = "http://127.0.0.1:8899".into();
        assert_eq!(config.ws_url(), "ws://127.0.0.1:8899");
        config.rpc_ws_url = "ws://127.0.0.1:8900".into();
        assert_eq!(config.ws_url(), "ws://127.0.0.1:8900");
    }

    #[test]
    fn validate_rejects_missing_and_bad_values() {
        let mut config = IndexerConfig::default();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        config.rpc_http_url = "http://localhost:8899".into();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        config.program_id = "not-base58-0OIl".into();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        config.program_id = PROGRAM.into();
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = IndexerConfig::from_toml_file("/nonexistent/votesync.toml");
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}

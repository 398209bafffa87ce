//! TOML file configuration structures.
//!
//! These structs directly map to the `tradewatch.toml` file format. Every
//! section is optional; missing values take the defaults below.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Webhook receiver section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Empty disables signature verification.
    #[serde(default)]
    pub secret: String,
}

/// Storage section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `trades.json`, `dead_letters.json` and `ledger.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Event processor section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            confirmation_threshold: default_confirmation_threshold(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_confirmation_threshold() -> u64 {
    3
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_attempts() -> u32 {
    5
}

fn default_min_backoff_ms() -> u64 {
    2_000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

/// Operator API section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token required on `/admin` routes. Unset leaves them open.
    #[serde(default)]
    pub token: Option<String>,
}

/// Blockchain RPC section. Shared settings apply to every network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_secs")]
    pub timeout_secs: f64,
    #[serde(default = "default_rpc_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rpc_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default)]
    pub eth_url: Option<Url>,
    #[serde(default)]
    pub btc_url: Option<Url>,
    #[serde(default)]
    pub sol_url: Option<Url>,
    #[serde(default)]
    pub ltc_url: Option<Url>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_rpc_timeout_secs(),
            max_retries: default_rpc_max_retries(),
            backoff_factor: default_rpc_backoff_factor(),
            eth_url: None,
            btc_url: None,
            sol_url: None,
            ltc_url: None,
        }
    }
}

fn default_rpc_timeout_secs() -> f64 {
    10.0
}

fn default_rpc_max_retries() -> u32 {
    3
}

fn default_rpc_backoff_factor() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[webhook]
secret = "monitor-secret"

[storage]
data_dir = "/var/lib/tradewatch"

[processor]
confirmation_threshold = 6
queue_capacity = 64
max_attempts = 3
min_backoff_ms = 500
max_backoff_ms = 4000

[admin]
token = "ops-token"

[rpc]
timeout_secs = 5
max_retries = 4
backoff_factor = 1.5
eth_url = "https://eth.example.com/rpc"
sol_url = "https://sol.example.com"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.webhook.secret, "monitor-secret");
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/tradewatch"));
        assert_eq!(config.processor.confirmation_threshold, 6);
        assert_eq!(config.processor.max_backoff_ms, 4000);
        assert_eq!(config.admin.token.as_deref(), Some("ops-token"));
        assert_eq!(config.rpc.timeout_secs, 5.0);
        assert_eq!(config.rpc.max_retries, 4);
        assert!(config.rpc.eth_url.is_some());
        assert!(config.rpc.btc_url.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.processor.confirmation_threshold, 3);
        assert_eq!(config.processor.max_attempts, 5);
        assert_eq!(config.rpc.max_retries, 3);
        assert_eq!(config.rpc.backoff_factor, 2.0);
        assert!(config.webhook.secret.is_empty());
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: FileConfig = toml::from_str("[processor]\nconfirmation_threshold = 12\n").unwrap();
        assert_eq!(config.processor.confirmation_threshold, 12);
        assert_eq!(config.processor.queue_capacity, 1024);
        assert_eq!(config.processor.min_backoff_ms, 2_000);
    }
}

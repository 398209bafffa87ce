//! Configuration module for tradewatch-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments,
//! and environment variables, then validates it into the runtime types
//! used by `tradewatch-core`.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tradewatch_core::config::{
    NetworkEndpoint, ProcessorConfig, RetryPolicy, RpcConfig, WebhookConfig,
};
use tradewatch_sdk::objects::Network;
use url::Url;

/// Environment variables that override file values.
pub const ENV_WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
pub const ENV_DATA_DIR: &str = "TRADEWATCH_DATA_DIR";
pub const ENV_ADMIN_TOKEN: &str = "TRADEWATCH_ADMIN_TOKEN";

/// Per-network RPC URL variables.
pub fn rpc_url_env(network: Network) -> &'static str {
    match network {
        Network::Eth => "ETH_RPC_URL",
        Network::Btc => "BTC_RPC_URL",
        Network::Sol => "SOL_RPC_URL",
        Network::Ltc => "LTC_RPC_URL",
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub webhook: WebhookConfig,
    pub processor: ProcessorConfig,
    pub rpc: RpcConfig,
    pub admin_token: Option<String>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file means all defaults)
    /// 2. Apply environment overrides
    /// 3. Apply CLI overrides
    /// 4. Validate and build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = self.read_file()?;
        self.resolve(file_config, |key| std::env::var(key).ok())
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Config file {:?} not found, using defaults",
                    self.config_path
                );
                Ok(FileConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply overrides from `env` and the CLI, then validate.
    fn resolve(
        &self,
        mut file_config: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        apply_env_overrides(&mut file_config, &env)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }
}

fn apply_env_overrides(
    config: &mut FileConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(secret) = non_empty(ENV_WEBHOOK_SECRET) {
        config.webhook.secret = secret;
    }
    if let Some(dir) = non_empty(ENV_DATA_DIR) {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(token) = non_empty(ENV_ADMIN_TOKEN) {
        config.admin.token = Some(token);
    }

    for network in Network::ALL {
        let name = rpc_url_env(network);
        let Some(raw) = non_empty(name) else {
            continue;
        };
        let url = Url::parse(raw.trim())
            .map_err(|source| ConfigError::InvalidUrl { name, source })?;
        let slot = match network {
            Network::Eth => &mut config.rpc.eth_url,
            Network::Btc => &mut config.rpc.btc_url,
            Network::Sol => &mut config.rpc.sol_url,
            Network::Ltc => &mut config.rpc.ltc_url,
        };
        *slot = Some(url);
    }
    Ok(())
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_owned()));

    let processor = &config.processor;
    if processor.confirmation_threshold == 0 {
        return invalid("processor.confirmation_threshold must be at least 1");
    }
    if processor.queue_capacity == 0 {
        return invalid("processor.queue_capacity must be at least 1");
    }
    if processor.max_attempts == 0 {
        return invalid("processor.max_attempts must be at least 1");
    }
    if processor.min_backoff_ms > processor.max_backoff_ms {
        return invalid("processor.min_backoff_ms must not exceed processor.max_backoff_ms");
    }

    let rpc = &config.rpc;
    if !(rpc.timeout_secs.is_finite() && rpc.timeout_secs > 0.0) {
        return invalid("rpc.timeout_secs must be positive");
    }
    if rpc.max_retries == 0 {
        return invalid("rpc.max_retries must be at least 1");
    }
    if !(rpc.backoff_factor.is_finite() && rpc.backoff_factor >= 1.0) {
        return invalid("rpc.backoff_factor must be at least 1.0");
    }

    if config.admin.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return invalid("admin.token must not be blank");
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    let processor = ProcessorConfig {
        confirmation_threshold: file_config.processor.confirmation_threshold,
        queue_capacity: file_config.processor.queue_capacity,
        retry: RetryPolicy {
            max_attempts: file_config.processor.max_attempts,
            min_delay: Duration::from_millis(file_config.processor.min_backoff_ms),
            max_delay: Duration::from_millis(file_config.processor.max_backoff_ms),
            ..RetryPolicy::default()
        },
    };

    let rpc_file = file_config.rpc;
    let timeout = Duration::from_secs_f64(rpc_file.timeout_secs);
    let urls = [
        (Network::Eth, rpc_file.eth_url),
        (Network::Btc, rpc_file.btc_url),
        (Network::Sol, rpc_file.sol_url),
        (Network::Ltc, rpc_file.ltc_url),
    ];
    let rpc = urls
        .into_iter()
        .filter_map(|(network, url)| url.map(|url| (network, url)))
        .fold(RpcConfig::new(), |rpc, (network, url)| {
            rpc.with_endpoint(
                network,
                NetworkEndpoint::new(url)
                    .with_timeout(timeout)
                    .with_retries(rpc_file.max_retries, rpc_file.backoff_factor),
            )
        });

    LoadedConfig {
        listen: file_config.server.listen,
        data_dir: file_config.storage.data_dir,
        webhook: WebhookConfig::new(file_config.webhook.secret),
        processor,
        rpc,
        admin_token: file_config.admin.token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn loader() -> ConfigLoader {
        ConfigLoader::new("/nonexistent/tradewatch.toml", None)
    }

    #[test]
    fn test_defaults_without_file() {
        let loaded = loader().load().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(loaded.processor.confirmation_threshold, 3);
        assert_eq!(loaded.processor.retry.max_attempts, 5);
        assert_eq!(loaded.processor.retry.min_delay, Duration::from_secs(2));
        assert_eq!(loaded.processor.retry.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut file = FileConfig::default();
        file.webhook.secret = "from-file".into();
        let loaded = loader()
            .resolve(
                file,
                env(&[
                    ("WEBHOOK_SECRET", "from-env"),
                    ("TRADEWATCH_DATA_DIR", "/tmp/tw"),
                    ("ETH_RPC_URL", "http://localhost:8545"),
                    ("LTC_RPC_URL", "   "),
                ]),
            )
            .unwrap();

        assert_eq!(loaded.webhook.secret_bytes(), Some(&b"from-env"[..]));
        assert_eq!(loaded.data_dir, PathBuf::from("/tmp/tw"));
        let eth = loaded.rpc.endpoint(Network::Eth).unwrap();
        assert_eq!(eth.url.as_str(), "http://localhost:8545/");
        assert_eq!(eth.timeout, Duration::from_secs(10));
        assert_eq!(eth.max_retries, 3);
        assert!(loaded.rpc.endpoint(Network::Ltc).is_none());
    }

    #[test]
    fn test_empty_secret_disables_verification() {
        let loaded = loader().resolve(FileConfig::default(), env(&[])).unwrap();
        assert!(loaded.webhook.secret_bytes().is_none());
    }

    #[test]
    fn test_cli_listen_override_wins() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::new("/nonexistent.toml", Some(addr))
            .resolve(FileConfig::default(), env(&[]))
            .unwrap();
        assert_eq!(loaded.listen, addr);
    }

    #[test]
    fn test_invalid_rpc_url_is_rejected() {
        let err = loader()
            .resolve(FileConfig::default(), env(&[("BTC_RPC_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { name: "BTC_RPC_URL", .. }));
    }

    #[test]
    fn test_validation_rules() {
        let cases: Vec<Box<dyn Fn(&mut FileConfig)>> = vec![
            Box::new(|c| c.processor.confirmation_threshold = 0),
            Box::new(|c| c.processor.queue_capacity = 0),
            Box::new(|c| c.processor.max_attempts = 0),
            Box::new(|c| c.processor.min_backoff_ms = 20_000),
            Box::new(|c| c.rpc.timeout_secs = 0.0),
            Box::new(|c| c.rpc.max_retries = 0),
            Box::new(|c| c.rpc.backoff_factor = 0.5),
            Box::new(|c| c.admin.token = Some(" ".into())),
        ];
        for mutate in cases {
            let mut config = FileConfig::default();
            mutate(&mut config);
            assert!(matches!(
                loader().resolve(config, env(&[])),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tradewatch.toml");
        std::fs::write(&path, "[processor]\nconfirmation_threshold = 7\n").unwrap();
        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        assert_eq!(loaded.processor.confirmation_threshold, 7);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tradewatch.toml");
        std::fs::write(&path, "[processor\n").unwrap();
        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::ParseError(_))
        ));
    }
}

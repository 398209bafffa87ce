//! Blockchain RPC endpoint configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use tradewatch_sdk::objects::Network;
use url::Url;

/// Connection settings for one network's JSON-RPC node.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEndpoint {
    pub url: Url,
    /// Per-request timeout for regular calls.
    pub timeout: Duration,
    /// Total attempts per call, including the first one.
    pub max_retries: u32,
    /// Wait before retry `n` (0-based) is `backoff_unit * backoff_factor^n`.
    pub backoff_factor: f64,
    pub backoff_unit: Duration,
}

impl NetworkEndpoint {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Self::DEFAULT_TIMEOUT,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            backoff_factor: Self::DEFAULT_BACKOFF_FACTOR,
            backoff_unit: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_factor: f64) -> Self {
        self.max_retries = max_retries;
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Wait before retry `attempt` (0-based, counted from the first failure).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_unit.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Endpoints for every configured network. Networks without an entry are
/// simply not reachable; calls for them fail fast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcConfig {
    endpoints: BTreeMap<Network, NetworkEndpoint>,
}

impl RpcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, network: Network, endpoint: NetworkEndpoint) -> Self {
        self.endpoints.insert(network, endpoint);
        self
    }

    pub fn endpoint(&self, network: Network) -> Option<&NetworkEndpoint> {
        self.endpoints.get(&network)
    }

    /// Configured networks in stable order.
    pub fn networks(&self) -> impl Iterator<Item = Network> + '_ {
        self.endpoints.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> NetworkEndpoint {
        NetworkEndpoint::new(Url::parse("http://127.0.0.1:8545").unwrap())
    }

    #[test]
    fn backoff_grows_by_factor() {
        let ep = endpoint();
        assert_eq!(ep.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(ep.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(ep.backoff_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates() {
        let ep = endpoint().with_retries(3, 1e12);
        assert_eq!(ep.backoff_delay(100), Duration::MAX);
    }

    #[test]
    fn unconfigured_networks_are_absent() {
        let config = RpcConfig::new().with_endpoint(Network::Sol, endpoint());
        assert!(config.endpoint(Network::Eth).is_none());
        assert_eq!(config.networks().collect::<Vec<_>>(), vec![Network::Sol]);
    }
}

//! Multi-network JSON-RPC client.
//!
//! One [`RpcClient`] serves every configured network. Calls are retried
//! with exponential backoff on transport failures and node-reported errors;
//! health probes are single short-timeout requests that never error.

mod envelope;
mod queries;

pub use envelope::{JsonRpcRequest, JsonRpcResponse, health_method, protocol_version};
pub use queries::parse_hex_quantity;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use tradewatch_sdk::objects::Network;

use crate::config::{NetworkEndpoint, RpcConfig};

/// Timeout of a single health probe.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur during an RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No endpoint configured for the network
    #[error("RPC URL not configured for {0}")]
    NotConfigured(Network),

    /// Connection refused, reset, or a non-JSON error response
    #[error("connection error: {0}")]
    Connection(String),

    /// The node did not answer within the per-request timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The node answered with a JSON-RPC error or an unreadable body
    #[error("RPC error: {message}")]
    Protocol { code: Option<i64>, message: String },

    /// The call succeeded but its result had an unexpected shape
    #[error("unexpected RPC result: {0}")]
    Decode(String),
}

pub struct RpcClient {
    config: RpcConfig,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn endpoint(&self, network: Network) -> Result<&NetworkEndpoint, RpcError> {
        self.config
            .endpoint(network)
            .ok_or(RpcError::NotConfigured(network))
    }

    fn request<'a>(&self, network: Network, method: &'a str, params: Value) -> JsonRpcRequest<'a> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        JsonRpcRequest::new(network, method, params, id)
    }

    /// Call `method` on `network`'s node and return the `result` field
    /// (`null` when absent).
    ///
    /// Up to `max_retries` attempts are made; between attempts the client
    /// waits `backoff_unit * backoff_factor^n`. The last error is returned
    /// when every attempt fails.
    pub async fn execute(
        &self,
        network: Network,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let endpoint = self.endpoint(network)?;
        let request = self.request(network, method, params);
        let attempts = endpoint.max_retries.max(1);

        let mut attempt = 0;
        loop {
            let error = match self.send_once(endpoint, &request).await {
                Ok(result) => {
                    debug!(%network, method, attempt = attempt + 1, "RPC call succeeded");
                    return Ok(result);
                }
                Err(e) => e,
            };
            warn!(
                %network,
                method,
                attempt = attempt + 1,
                max_attempts = attempts,
                error = %error,
                "RPC call failed"
            );
            if attempt + 1 >= attempts {
                return Err(error);
            }
            tokio::time::sleep(endpoint.backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        endpoint: &NetworkEndpoint,
        request: &JsonRpcRequest<'_>,
    ) -> Result<Value, RpcError> {
        let response = self
            .http_client
            .post(endpoint.url.clone())
            .timeout(endpoint.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| classify(e, endpoint.timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, endpoint.timeout))?;

        let decoded: JsonRpcResponse = match serde_json::from_slice(&body) {
            Ok(decoded) => decoded,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Connection(format!("HTTP {status}")));
            }
            Err(e) => {
                return Err(RpcError::Protocol {
                    code: None,
                    message: format!("invalid JSON-RPC response: {e}"),
                });
            }
        };
        if let Some((code, message)) = decoded.error() {
            return Err(RpcError::Protocol { code, message });
        }
        Ok(decoded.result)
    }

    /// Probe one network. Any failure, including a missing endpoint, reads
    /// as unhealthy.
    pub async fn health_check(&self, network: Network) -> bool {
        let Ok(endpoint) = self.endpoint(network) else {
            warn!(%network, "No RPC URL configured");
            return false;
        };
        let request = self.request(network, health_method(network), Value::Array(Vec::new()));

        let response = match self
            .http_client
            .post(endpoint.url.clone())
            .timeout(HEALTH_CHECK_TIMEOUT)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%network, error = %e, "Health check failed");
                return false;
            }
        };

        let status = response.status();
        match response.json::<JsonRpcResponse>().await {
            Ok(body) => status.is_success() && body.error().is_none(),
            Err(e) => {
                warn!(%network, %status, error = %e, "Health check returned an unreadable body");
                false
            }
        }
    }

    /// Probe every configured network concurrently.
    pub async fn health_check_all(&self) -> BTreeMap<Network, bool> {
        let probes = self.config.networks().map(|network| async move {
            (network, self.health_check(network).await)
        });
        join_all(probes).await.into_iter().collect()
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> RpcError {
    if error.is_timeout() {
        RpcError::Timeout(timeout)
    } else {
        RpcError::Connection(error.to_string())
    }
}

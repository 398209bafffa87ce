//! JSON-RPC request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tradewatch_sdk::objects::Network;

/// Bitcoin-family nodes still speak JSON-RPC 1.0.
pub fn protocol_version(network: Network) -> &'static str {
    if network.is_utxo() { "1.0" } else { "2.0" }
}

/// Cheapest call that proves a node is answering.
pub fn health_method(network: Network) -> &'static str {
    match network {
        Network::Eth => "eth_chainId",
        Network::Btc | Network::Ltc => "getblockchaininfo",
        Network::Sol => "getHealth",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(network: Network, method: &'a str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: protocol_version(network),
            method,
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

impl JsonRpcResponse {
    /// `Some((code, message))` when the node reported an error.
    pub fn error(&self) -> Option<(Option<i64>, String)> {
        match &self.error {
            Value::Null => None,
            Value::Object(fields) => {
                let code = fields.get("code").and_then(Value::as_i64);
                let message = fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| self.error.to_string());
                Some((code, message))
            }
            other => Some((None, other.to_string())),
        }
    }
}

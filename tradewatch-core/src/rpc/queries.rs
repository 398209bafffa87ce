//! Typed wrappers over common node methods.
//!
//! Absent results map to each network's zero value instead of an error.

use serde_json::{Value, json};
use tradewatch_sdk::objects::Network;

use super::{RpcClient, RpcError};

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_quantity(value: &str) -> Option<u128> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

fn hex_or_zero(result: Value) -> String {
    match result {
        Value::String(s) if s.starts_with("0x") => s,
        Value::String(s) if !s.is_empty() => format!("0x{s}"),
        _ => "0x0".to_owned(),
    }
}

fn eth_address(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_owned()
    } else {
        format!("0x{address}")
    }
}

fn object_or_empty(result: Value) -> Value {
    if result.is_null() { json!({}) } else { result }
}

impl RpcClient {
    // -- Ethereum -------------------------------------------------------------

    /// Balance in wei, as a hex quantity.
    pub async fn eth_get_balance(&self, address: &str, block: &str) -> Result<String, RpcError> {
        let result = self
            .execute(Network::Eth, "eth_getBalance", json!([eth_address(address), block]))
            .await?;
        Ok(hex_or_zero(result))
    }

    pub async fn eth_get_transaction_count(
        &self,
        address: &str,
        block: &str,
    ) -> Result<String, RpcError> {
        let result = self
            .execute(
                Network::Eth,
                "eth_getTransactionCount",
                json!([eth_address(address), block]),
            )
            .await?;
        Ok(hex_or_zero(result))
    }

    pub async fn eth_gas_price(&self) -> Result<String, RpcError> {
        let result = self.execute(Network::Eth, "eth_gasPrice", json!([])).await?;
        Ok(hex_or_zero(result))
    }

    pub async fn eth_block_number(&self) -> Result<String, RpcError> {
        let result = self.execute(Network::Eth, "eth_blockNumber", json!([])).await?;
        Ok(hex_or_zero(result))
    }

    /// `None` when the node does not know the transaction.
    pub async fn eth_get_transaction(&self, tx_hash: &str) -> Result<Option<Value>, RpcError> {
        let result = self
            .execute(Network::Eth, "eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        Ok((!result.is_null()).then_some(result))
    }

    // -- Bitcoin / Litecoin ---------------------------------------------------

    /// Balance reported by `getaddressinfo`; `0.0` when absent.
    pub async fn utxo_get_balance(&self, network: Network, address: &str) -> Result<f64, RpcError> {
        let result = self
            .execute(network, "getaddressinfo", json!([address]))
            .await?;
        Ok(result.get("balance").and_then(Value::as_f64).unwrap_or(0.0))
    }

    pub async fn utxo_get_block_count(&self, network: Network) -> Result<u64, RpcError> {
        let result = self.execute(network, "getblockcount", json!([])).await?;
        Ok(result.as_u64().unwrap_or(0))
    }

    /// Decoded transaction (`getrawtransaction` verbose); `{}` when absent.
    pub async fn utxo_get_transaction(&self, network: Network, txid: &str) -> Result<Value, RpcError> {
        let result = self
            .execute(network, "getrawtransaction", json!([txid, true]))
            .await?;
        Ok(object_or_empty(result))
    }

    // -- Solana ---------------------------------------------------------------

    /// Balance in lamports.
    pub async fn sol_get_balance(&self, address: &str) -> Result<u64, RpcError> {
        let result = self.execute(Network::Sol, "getBalance", json!([address])).await?;
        Ok(result.get("value").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn sol_get_account_info(&self, address: &str) -> Result<Value, RpcError> {
        let result = self
            .execute(Network::Sol, "getAccountInfo", json!([address, {"encoding": "base64"}]))
            .await?;
        Ok(object_or_empty(result))
    }

    pub async fn sol_get_signature_statuses(&self, signatures: &[&str]) -> Result<Value, RpcError> {
        let result = self
            .execute(Network::Sol, "getSignatureStatuses", json!([signatures]))
            .await?;
        Ok(object_or_empty(result))
    }

    pub async fn sol_get_slot(&self) -> Result<u64, RpcError> {
        let result = self.execute(Network::Sol, "getSlot", json!([])).await?;
        Ok(result.as_u64().unwrap_or(0))
    }

    // -- Any network ----------------------------------------------------------

    /// Current chain height: block number, block count, or slot.
    pub async fn block_height(&self, network: Network) -> Result<u64, RpcError> {
        match network {
            Network::Eth => {
                let hex = self.eth_block_number().await?;
                parse_hex_quantity(&hex)
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| RpcError::Decode(format!("invalid block number: {hex}")))
            }
            Network::Btc | Network::Ltc => self.utxo_get_block_count(network).await,
            Network::Sol => self.sol_get_slot().await,
        }
    }
}

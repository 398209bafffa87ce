//! Normalization of raw webhook payloads.
//!
//! Common fields are read the same way for every network; the network then
//! decides which of the remaining fields form the event's `data`.

use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use tradewatch_sdk::objects::{DEFAULT_EVENT_TYPE, Network};

use crate::entities::WebhookRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("missing event_id")]
    MissingEventId,
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("confirmations must be a non-negative integer")]
    InvalidConfirmations,
    #[error("missing trade_id and tx_hash")]
    MissingTradeId,
}

const ETH_FIELDS: &[(&str, fn() -> Value)] = &[
    ("from", null),
    ("to", null),
    ("value", null),
    ("gas_price", null),
    ("gas_used", null),
];

const UTXO_FIELDS: &[(&str, fn() -> Value)] = &[
    ("inputs", empty_list),
    ("outputs", empty_list),
    ("fee", null),
    ("size", null),
];

const SOL_FIELDS: &[(&str, fn() -> Value)] = &[
    ("accounts", empty_list),
    ("instructions", empty_list),
    ("fee", null),
    ("slot", null),
];

fn null() -> Value {
    Value::Null
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

fn network_fields(network: Network) -> &'static [(&'static str, fn() -> Value)] {
    match network {
        Network::Eth => ETH_FIELDS,
        Network::Btc | Network::Ltc => UTXO_FIELDS,
        Network::Sol => SOL_FIELDS,
    }
}

/// The payload's `event_id`, required to be a non-empty string.
pub fn event_id(payload: &Map<String, Value>) -> Result<&str, PayloadError> {
    payload
        .get("event_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(PayloadError::MissingEventId)
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Normalize a payload whose `event_id` has already been checked.
pub fn normalize(
    payload: &Map<String, Value>,
    received_at: OffsetDateTime,
) -> Result<WebhookRecord, PayloadError> {
    let event_id = event_id(payload)?.to_owned();

    let raw_network = payload.get("network").and_then(Value::as_str).unwrap_or_default();
    let network: Network = raw_network
        .parse()
        .map_err(|_| PayloadError::UnsupportedNetwork(raw_network.to_owned()))?;

    let confirmation_count = match payload.get("confirmations") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or(PayloadError::InvalidConfirmations)?,
    };

    let tx_hash = string_field(payload, "tx_hash").unwrap_or_default();
    let trade_id = string_field(payload, "trade_id")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| tx_hash.clone());
    if trade_id.is_empty() {
        return Err(PayloadError::MissingTradeId);
    }

    let data: Map<String, Value> = network_fields(network)
        .iter()
        .map(|(key, default)| {
            let value = payload
                .get(*key)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(default);
            ((*key).to_owned(), value)
        })
        .collect();

    Ok(WebhookRecord {
        event_id,
        network,
        trade_id,
        tx_hash,
        confirmation_count,
        timestamp: string_field(payload, "timestamp").unwrap_or_default(),
        event_type: string_field(payload, "type").unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_owned()),
        data: Value::Object(data),
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn ethereum_fields_are_extracted() {
        let payload = object(json!({
            "event_id": "evt-1",
            "network": "eth",
            "trade_id": "trade-1",
            "tx_hash": "0xabc",
            "confirmations": 2,
            "timestamp": "2024-05-01T10:00:00Z",
            "from": "0x1",
            "to": "0x2",
            "value": "1000",
            "gas_price": "20",
            "nonce": 7
        }));
        let record = normalize(&payload, now()).unwrap();
        assert_eq!(record.network, Network::Eth);
        assert_eq!(record.confirmation_count, 2);
        assert_eq!(record.event_type, "transaction");
        assert_eq!(record.data["from"], "0x1");
        assert_eq!(record.data["gas_used"], Value::Null);
        assert!(record.data.get("nonce").is_none());
    }

    #[test]
    fn utxo_networks_share_shape() {
        for network in ["BTC", "ltc"] {
            let payload = object(json!({
                "event_id": "evt-1",
                "network": network,
                "tx_hash": "ff00",
                "fee": 250
            }));
            let record = normalize(&payload, now()).unwrap();
            assert_eq!(record.data["inputs"], json!([]));
            assert_eq!(record.data["outputs"], json!([]));
            assert_eq!(record.data["fee"], 250);
            assert_eq!(record.data["size"], Value::Null);
        }
    }

    #[test]
    fn solana_defaults() {
        let payload = object(json!({
            "event_id": "evt-1",
            "network": "Sol",
            "tx_hash": "sig",
            "slot": 12345,
            "type": "final_confirmation"
        }));
        let record = normalize(&payload, now()).unwrap();
        assert_eq!(record.network, Network::Sol);
        assert_eq!(record.event_type, "final_confirmation");
        assert_eq!(record.data["accounts"], json!([]));
        assert_eq!(record.data["slot"], 12345);
    }

    #[test]
    fn trade_id_falls_back_to_tx_hash() {
        let payload = object(json!({"event_id": "e", "network": "ETH", "tx_hash": "0xdef"}));
        assert_eq!(normalize(&payload, now()).unwrap().trade_id, "0xdef");

        let payload = object(json!({"event_id": "e", "network": "ETH"}));
        assert_eq!(
            normalize(&payload, now()).unwrap_err(),
            PayloadError::MissingTradeId
        );
    }

    #[test]
    fn rejects_bad_input() {
        let unknown = object(json!({"event_id": "e", "network": "DOGE", "tx_hash": "x"}));
        assert_eq!(
            normalize(&unknown, now()).unwrap_err(),
            PayloadError::UnsupportedNetwork("DOGE".into())
        );

        let missing = object(json!({"event_id": "e", "tx_hash": "x"}));
        assert!(matches!(
            normalize(&missing, now()),
            Err(PayloadError::UnsupportedNetwork(_))
        ));

        for bad in [json!(-1), json!("3"), json!(1.5)] {
            let payload = object(json!({
                "event_id": "e", "network": "ETH", "tx_hash": "x", "confirmations": bad
            }));
            assert_eq!(
                normalize(&payload, now()).unwrap_err(),
                PayloadError::InvalidConfirmations
            );
        }
    }

    #[test]
    fn event_id_must_be_non_empty_string() {
        assert!(event_id(&object(json!({"event_id": "e1"}))).is_ok());
        for payload in [json!({}), json!({"event_id": ""}), json!({"event_id": 42})] {
            assert_eq!(
                event_id(&object(payload)).unwrap_err(),
                PayloadError::MissingEventId
            );
        }
    }
}

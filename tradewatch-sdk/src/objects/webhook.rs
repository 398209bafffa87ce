//! Webhook wire types shared by chain monitors and the receiver.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::network::Network;

/// Event type that marks a monitor's finality signal for a transaction.
pub const FINALITY_EVENT_TYPE: &str = "final_confirmation";

/// Event type assumed when a payload carries none.
pub const DEFAULT_EVENT_TYPE: &str = "transaction";

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_owned()
}

/// Body a chain monitor POSTs to `/webhook`.
///
/// The receiver reads payloads field by field so it can report precise
/// validation errors; this struct is the sending side's view. Network
/// specific fields (`from`, `inputs`, `slot`, ...) travel in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event_id: String,
    pub network: Network,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WebhookEnvelope {
    pub fn new(event_id: impl Into<String>, network: Network, tx_hash: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            network,
            trade_id: None,
            tx_hash: tx_hash.into(),
            confirmations: 0,
            timestamp: String::new(),
            event_type: default_event_type(),
            extra: Map::new(),
        }
    }

    pub fn with_trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(trade_id.into());
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Successful receiver acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookAck {
    Received {
        event_id: String,
        network: Network,
        tx_hash: String,
    },
    Duplicate {
        event_id: String,
    },
}

impl WebhookAck {
    pub fn event_id(&self) -> &str {
        match self {
            WebhookAck::Received { event_id, .. } | WebhookAck::Duplicate { event_id } => event_id,
        }
    }
}

/// Body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// One applied event as recorded in a trade's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: String,
    pub tx_hash: String,
    pub confirmation_count: u64,
    pub timestamp: String,
    pub event_type: String,
}

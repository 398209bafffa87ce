//! Normalized event definition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tradewatch_sdk::objects::{EventSummary, FINALITY_EVENT_TYPE};

/// A confirmation event as seen by the processor.
///
/// `retry_count` is zero for fresh events and counts operator replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub trade_id: String,
    pub tx_hash: String,
    pub confirmation_count: u64,
    /// Monitor-reported timestamp, kept verbatim.
    pub timestamp: String,
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub retry_count: u32,
}

impl Event {
    /// Whether this event is the monitor's finality signal.
    pub fn is_finality(&self) -> bool {
        self.event_type == FINALITY_EVENT_TYPE
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            event_id: self.event_id.clone(),
            tx_hash: self.tx_hash.clone(),
            confirmation_count: self.confirmation_count,
            timestamp: self.timestamp.clone(),
            event_type: self.event_type.clone(),
        }
    }
}

//! Operator API request and response types.
//!
//! Timestamps are unix seconds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::webhook::EventSummary;

/// Lifecycle of a trade.
///
/// `Pending -> Confirmed -> Completed`, with `Failed` reachable only by
/// operator action. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Confirmed,
    Completed,
    Failed,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Completed | TradeStatus::Failed)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Confirmed => "confirmed",
            TradeStatus::Completed => "completed",
            TradeStatus::Failed => "failed",
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResponse {
    pub trade_id: String,
    pub status: TradeStatus,
    pub confirmations: u64,
    pub created_at: i64,
    pub confirmed_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub failure_reason: Option<String>,
    pub events: Vec<EventSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterResponse {
    pub event_id: String,
    pub trade_id: String,
    pub error_message: String,
    pub timestamp: i64,
    pub retry_count: u32,
    pub original_event: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub event_id: String,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResponse {
    pub replayed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatsResponse {
    pub queue_depth: usize,
    pub processed_count: usize,
    pub dead_letter_count: usize,
    pub replaying_count: usize,
}

/// Reachability per configured network, keyed by network name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHealthResponse {
    pub networks: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestTrade {
    pub trade_id: String,
    pub status: TradeStatus,
    pub confirmations: u64,
    pub created_at: i64,
    pub confirmed_at: Option<i64>,
    pub completed_at: Option<i64>,
}

/// Point-in-time pipeline metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: i64,
    pub total_trades: usize,
    pub pending_trades: usize,
    pub confirmed_trades: usize,
    pub completed_trades: usize,
    pub failed_trades: usize,
    /// Pending plus confirmed.
    pub in_flight_trades: usize,
    /// Percentage of trades that reached `completed`, two decimals.
    pub success_rate: f64,
    /// Percentage of trades marked `failed`, two decimals.
    pub failure_rate: f64,
    /// Mean seconds from creation to confirmation over confirmed trades.
    pub average_confirmation_secs: Option<f64>,
    pub queue_depth: usize,
    pub processed_count: usize,
    pub dead_letter_count: usize,
    pub health: HealthStatus,
    pub latest_trades: Vec<LatestTrade>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkFailedRequest {
    pub reason: String,
}

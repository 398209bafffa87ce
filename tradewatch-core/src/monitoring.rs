//! Pipeline metrics.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use tradewatch_sdk::objects::{HealthStatus, LatestTrade, MetricsSnapshot, TradeStatus};

use crate::entities::Trade;

/// Number of most recent trades included in a snapshot.
pub const LATEST_TRADES: usize = 5;

/// Queue and store counters gathered alongside the trade book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    pub queue_depth: usize,
    pub processed_count: usize,
    pub dead_letter_count: usize,
}

/// Derive the health verdict.
///
/// Unhealthy below 80% success or with more than 10 dead letters, degraded
/// below 95% or with more than 5.
pub fn health_status(success_rate: f64, dead_letter_count: usize) -> HealthStatus {
    if success_rate < 80.0 || dead_letter_count > 10 {
        HealthStatus::Unhealthy
    } else if success_rate < 95.0 || dead_letter_count > 5 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

pub fn collect(
    trades: &BTreeMap<String, Trade>,
    counters: PipelineCounters,
    now: OffsetDateTime,
) -> MetricsSnapshot {
    let count = |status: TradeStatus| trades.values().filter(|t| t.status == status).count();
    let total = trades.len();
    let completed = count(TradeStatus::Completed);
    let failed = count(TradeStatus::Failed);

    let durations: Vec<f64> = trades
        .values()
        .filter_map(|t| t.confirmed_at.map(|at| (at - t.created_at).as_seconds_f64()))
        .collect();
    let average_confirmation_secs = (!durations.is_empty())
        .then(|| round2(durations.iter().sum::<f64>() / durations.len() as f64));

    let mut latest: Vec<(&String, &Trade)> = trades.iter().collect();
    latest.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at).then_with(|| a.0.cmp(b.0)));
    let latest_trades = latest
        .into_iter()
        .take(LATEST_TRADES)
        .map(|(id, t)| LatestTrade {
            trade_id: id.clone(),
            status: t.status,
            confirmations: t.confirmations,
            created_at: t.created_at.unix_timestamp(),
            confirmed_at: t.confirmed_at.map(OffsetDateTime::unix_timestamp),
            completed_at: t.completed_at.map(OffsetDateTime::unix_timestamp),
        })
        .collect();

    let pending = count(TradeStatus::Pending);
    let confirmed = count(TradeStatus::Confirmed);
    let success_rate = percentage(completed, total);
    MetricsSnapshot {
        timestamp: now.unix_timestamp(),
        total_trades: total,
        pending_trades: pending,
        confirmed_trades: confirmed,
        completed_trades: completed,
        failed_trades: failed,
        in_flight_trades: pending + confirmed,
        success_rate,
        failure_rate: percentage(failed, total),
        average_confirmation_secs,
        queue_depth: counters.queue_depth,
        processed_count: counters.processed_count,
        dead_letter_count: counters.dead_letter_count,
        health: health_status(success_rate, counters.dead_letter_count),
        latest_trades,
    }
}

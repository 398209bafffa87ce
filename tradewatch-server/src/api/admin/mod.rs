//! Admin API handlers.
//!
//! These endpoints are used by operators and require
//! `Authorization: Bearer <token>` when an admin token is configured.
//!
//! # Endpoints
//!
//! - `GET  /trades/{trade_id}`              – show one trade
//! - `POST /trades/{trade_id}/fail`         – mark a trade failed
//! - `GET  /dead-letters`                   – list parked dead-letter entries
//! - `POST /dead-letters/{event_id}/replay` – replay one parked entry
//! - `POST /dead-letters/sweep`             – replay every parked entry
//! - `GET  /queue`                          – queue and ledger counters
//! - `GET  /metrics`                        – metrics snapshot
//! - `GET  /rpc/health`                     – probe every configured RPC node

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tradewatch_core::entities::{DeadLetterEntry, MarkFailedError, ReplayError, Trade};
use tradewatch_core::storage::StoreError;
use tradewatch_sdk::objects::{DeadLetterResponse, ErrorResponse, TradeResponse};

use crate::state::AppState;

mod dead_letters;
mod stats;
mod trades;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trades/{trade_id}", get(trades::get_trade))
        .route("/trades/{trade_id}/fail", post(trades::mark_failed))
        .route("/dead-letters", get(dead_letters::list_dead_letters))
        .route("/dead-letters/sweep", post(dead_letters::sweep))
        .route(
            "/dead-letters/{event_id}/replay",
            post(dead_letters::replay),
        )
        .route("/queue", get(stats::queue_stats))
        .route("/metrics", get(stats::metrics))
        .route("/rpc/health", get(stats::rpc_health))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Store(StoreError),
    NotFound(String),
    Conflict(String),
    EventChannelClosed,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AdminApiError::Store(e) => {
                tracing::error!(error = %e, "Admin API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
            AdminApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AdminApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AdminApiError::EventChannelClosed => {
                tracing::error!("Admin API: event channel closed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for AdminApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<MarkFailedError> for AdminApiError {
    fn from(e: MarkFailedError) -> Self {
        match e {
            MarkFailedError::NotFound(_) => Self::NotFound(e.to_string()),
            MarkFailedError::AlreadyCompleted(_) => Self::Conflict(e.to_string()),
            MarkFailedError::Store(e) => Self::Store(e),
        }
    }
}

impl From<ReplayError> for AdminApiError {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::NotFound(_) => Self::NotFound(e.to_string()),
            ReplayError::AlreadyReplaying(_) => Self::Conflict(e.to_string()),
            ReplayError::QueueClosed => Self::EventChannelClosed,
            ReplayError::Store(e) => Self::Store(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn trade_to_response(trade_id: &str, t: &Trade) -> TradeResponse {
    TradeResponse {
        trade_id: trade_id.to_owned(),
        status: t.status,
        confirmations: t.confirmations,
        created_at: t.created_at.unix_timestamp(),
        confirmed_at: t.confirmed_at.map(|ts| ts.unix_timestamp()),
        completed_at: t.completed_at.map(|ts| ts.unix_timestamp()),
        failed_at: t.failed_at.map(|ts| ts.unix_timestamp()),
        failure_reason: t.failure_reason.clone(),
        events: t.events.clone(),
    }
}

pub(crate) fn dead_letter_to_response(
    e: &DeadLetterEntry,
) -> Result<DeadLetterResponse, AdminApiError> {
    let original_event = serde_json::to_value(&e.original_event)
        .map_err(|err| AdminApiError::Store(StoreError::Encode(err)))?;
    Ok(DeadLetterResponse {
        event_id: e.event_id.clone(),
        trade_id: e.trade_id.clone(),
        error_message: e.error_message.clone(),
        timestamp: e.timestamp.unix_timestamp(),
        retry_count: e.retry_count,
        original_event,
    })
}

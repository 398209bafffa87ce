use axum::{
    Json,
    extract::{Path, State},
};
use tradewatch_sdk::objects::{MarkFailedRequest, TradeResponse};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, trade_to_response};

/// `GET /trades/{trade_id}` - show one trade with its event history.
pub async fn get_trade(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeResponse>, AdminApiError> {
    let trade = state
        .processor
        .trade(&trade_id)
        .await?
        .ok_or_else(|| AdminApiError::NotFound(format!("trade not found: {trade_id}")))?;
    Ok(Json(trade_to_response(&trade_id, &trade)))
}

/// `POST /trades/{trade_id}/fail` - move a pending or confirmed trade to
/// `failed`.
///
/// Failing an already failed trade returns it unchanged; a completed trade
/// is a conflict.
pub async fn mark_failed(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(trade_id): Path<String>,
    Json(request): Json<MarkFailedRequest>,
) -> Result<Json<TradeResponse>, AdminApiError> {
    let trade = state
        .processor
        .mark_trade_failed(&trade_id, &request.reason)
        .await?;
    Ok(Json(trade_to_response(&trade_id, &trade)))
}

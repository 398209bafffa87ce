use axum::{Json, extract::State};
use tradewatch_sdk::objects::{MetricsSnapshot, QueueStatsResponse, RpcHealthResponse};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `GET /queue` - queue depth and ledger/dead-letter counters.
pub async fn queue_stats(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<QueueStatsResponse>, AdminApiError> {
    let processor = &state.processor;
    Ok(Json(QueueStatsResponse {
        queue_depth: processor.queue_depth(),
        processed_count: processor.processed_count().await?,
        dead_letter_count: processor.dead_letters().await?.len(),
        replaying_count: processor.replaying().await?.len(),
    }))
}

/// `GET /metrics` - trade and pipeline metrics computed on demand.
pub async fn metrics(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<MetricsSnapshot>, AdminApiError> {
    Ok(Json(state.processor.metrics().await?))
}

/// `GET /rpc/health` - probe every configured node.
pub async fn rpc_health(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Json<RpcHealthResponse> {
    let networks = state
        .rpc
        .health_check_all()
        .await
        .into_iter()
        .map(|(network, healthy)| (network.as_str().to_owned(), healthy))
        .collect();
    Json(RpcHealthResponse { networks })
}

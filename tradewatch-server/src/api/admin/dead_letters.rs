use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tradewatch_sdk::objects::{DeadLetterResponse, ReplayResponse, SweepResponse};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, dead_letter_to_response};

/// `GET /dead-letters` - list parked entries.
///
/// Entries currently being replayed are not included.
pub async fn list_dead_letters(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<Vec<DeadLetterResponse>>, AdminApiError> {
    let entries = state.processor.dead_letters().await?;
    let items = entries
        .iter()
        .map(dead_letter_to_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

/// `POST /dead-letters/{event_id}/replay` - re-enqueue one parked event.
pub async fn replay(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<ReplayResponse>), AdminApiError> {
    let event = state.processor.replay_dead_letter(&event_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ReplayResponse {
            event_id: event.event_id,
            retry_count: event.retry_count,
        }),
    ))
}

/// `POST /dead-letters/sweep` - re-enqueue every parked event.
pub async fn sweep(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<SweepResponse>, AdminApiError> {
    let replayed = state.processor.sweep_dead_letters().await?;
    tracing::info!(replayed, "Dead-letter sweep finished");
    Ok(Json(SweepResponse { replayed }))
}

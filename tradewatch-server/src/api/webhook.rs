//! Webhook ingress handler.
//!
//! Provider deliveries are passed to the [`WebhookReceiver`] as raw bytes so
//! the signature is checked against exactly what was sent.
//!
//! [`WebhookReceiver`]: tradewatch_core::processors::WebhookReceiver

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tradewatch_core::processors::{IngestError, IngestOutcome};
use tradewatch_sdk::objects::{ErrorResponse, WebhookAck};
use tradewatch_sdk::signature::SIGNATURE_HEADER;

use crate::state::AppState;

/// Errors surfaced at the webhook boundary.
#[derive(Debug)]
pub struct WebhookApiError(IngestError);

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            IngestError::Authentication(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            IngestError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            IngestError::Storage(e) => {
                tracing::error!(error = %e, "Webhook ledger write failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
            IngestError::QueueClosed => {
                tracing::error!("Webhook accepted but the event queue is closed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// `POST /webhook` - receive one blockchain event.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()));

    let outcome = state
        .receiver
        .ingest(&body, signature.as_deref())
        .await
        .map_err(WebhookApiError)?;

    let ack = match outcome {
        IngestOutcome::Received(record) => WebhookAck::Received {
            event_id: record.event_id,
            network: record.network,
            tx_hash: record.tx_hash,
        },
        IngestOutcome::Duplicate { event_id } => WebhookAck::Duplicate { event_id },
    };
    Ok(Json(ack))
}

//! WebhookReceiver.
//!
//! The WebhookReceiver is responsible for:
//! - Authenticating the raw body against the shared secret
//! - Rejecting malformed payloads and unsupported networks
//! - Short-circuiting events it has already accepted
//! - Recording the normalized event in the ledger and queueing it
//!
//! It is transport agnostic; the HTTP layer maps [`IngestError`] to status
//! codes.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use tradewatch_sdk::signature::{SignatureError, verify_body};

use super::event_processor::ProcessorHandle;
use super::payload::{self, PayloadError};
use crate::config::WebhookConfig;
use crate::entities::{Acceptance, LedgerStore, WebhookRecord};
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] SignatureError),
    #[error("invalid payload: {0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("event queue closed")]
    QueueClosed,
}

impl From<PayloadError> for IngestError {
    fn from(e: PayloadError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Received(WebhookRecord),
    Duplicate { event_id: String },
}

pub struct WebhookReceiver {
    config: WebhookConfig,
    ledger: Arc<LedgerStore>,
    processor: ProcessorHandle,
}

impl WebhookReceiver {
    pub fn new(config: WebhookConfig, ledger: Arc<LedgerStore>, processor: ProcessorHandle) -> Self {
        if config.secret_bytes().is_none() {
            warn!("Webhook secret not configured, signature verification is disabled");
        }
        Self {
            config,
            ledger,
            processor,
        }
    }

    pub fn verification_enabled(&self) -> bool {
        self.config.secret_bytes().is_some()
    }

    /// Handle one delivery: `body` is the raw request body and `signature`
    /// the value of the signature header, if present.
    pub async fn ingest(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<IngestOutcome, IngestError> {
        if let Some(secret) = self.config.secret_bytes() {
            verify_body(body, signature.unwrap_or_default(), secret).inspect_err(|e| {
                warn!(error = %e, "Rejected webhook with bad signature");
            })?;
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| IngestError::Validation(format!("invalid JSON: {e}")))?;
        let fields = value.as_object().ok_or(PayloadError::NotAnObject)?;

        let event_id = payload::event_id(fields)?;
        if self.ledger.contains(event_id).await? {
            info!(event_id, "Duplicate webhook ignored");
            return Ok(IngestOutcome::Duplicate {
                event_id: event_id.to_owned(),
            });
        }

        let record = payload::normalize(fields, OffsetDateTime::now_utc())?;
        if self.ledger.accept(record.clone()).await? == Acceptance::Duplicate {
            debug!(event_id = %record.event_id, "Lost race with a concurrent delivery");
            return Ok(IngestOutcome::Duplicate {
                event_id: record.event_id,
            });
        }

        self.processor
            .enqueue(record.to_event())
            .await
            .map_err(|_| IngestError::QueueClosed)?;

        info!(
            event_id = %record.event_id,
            network = %record.network,
            trade_id = %record.trade_id,
            confirmations = record.confirmation_count,
            "Webhook accepted"
        );
        Ok(IngestOutcome::Received(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use crate::processors::EventProcessor;
    use crate::storage::Stores;
    use serde_json::json;
    use tokio::sync::watch;
    use tradewatch_sdk::objects::Network;
    use tradewatch_sdk::signature::sign_body;

    const SECRET: &str = "shh";

    struct Fixture {
        _dir: tempfile::TempDir,
        receiver: WebhookReceiver,
        handle: ProcessorHandle,
        ledger: Arc<LedgerStore>,
        _processor: EventProcessor,
        _shutdown_tx: watch::Sender<bool>,
    }

    async fn fixture(config: WebhookConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::open(dir.path()).await.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (processor, handle) = EventProcessor::new(
            ProcessorConfig::default(),
            stores.trades,
            stores.dead_letters,
            stores.ledger.clone(),
            shutdown_rx,
        );
        let receiver = WebhookReceiver::new(
            config,
            stores.ledger.clone(),
            handle.clone(),
        );
        Fixture {
            _dir: dir,
            receiver,
            handle,
            ledger: stores.ledger,
            _processor: processor,
            _shutdown_tx: shutdown_tx,
        }
    }

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn accepts_signed_payload() {
        let f = fixture(WebhookConfig::new(SECRET)).await;
        assert!(f.receiver.verification_enabled());
        let body = body(json!({
            "event_id": "evt-1",
            "network": "btc",
            "trade_id": "trade-1",
            "tx_hash": "ff00",
            "confirmations": 1
        }));
        let sig = sign_body(&body, SECRET.as_bytes());

        let outcome = f.receiver.ingest(&body, Some(&sig)).await.unwrap();
        let IngestOutcome::Received(record) = outcome else {
            panic!("expected a received outcome");
        };
        assert_eq!(record.network, Network::Btc);
        assert_eq!(record.trade_id, "trade-1");
        assert!(f.ledger.contains("evt-1").await.unwrap());
        assert_eq!(f.handle.queue_depth(), 1);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_not_requeued() {
        let f = fixture(WebhookConfig::new(SECRET)).await;
        let body = body(json!({"event_id": "evt-1", "network": "ETH", "tx_hash": "0x1"}));
        let sig = sign_body(&body, SECRET.as_bytes());

        f.receiver.ingest(&body, Some(&sig)).await.unwrap();
        let second = f.receiver.ingest(&body, Some(&sig)).await.unwrap();
        assert_eq!(
            second,
            IngestOutcome::Duplicate {
                event_id: "evt-1".into()
            }
        );
        assert_eq!(f.handle.queue_depth(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_or_missing_signature() {
        let f = fixture(WebhookConfig::new(SECRET)).await;
        let body = body(json!({"event_id": "evt-1", "network": "ETH", "tx_hash": "0x1"}));

        let wrong = sign_body(&body, b"other");
        assert!(matches!(
            f.receiver.ingest(&body, Some(&wrong)).await,
            Err(IngestError::Authentication(_))
        ));
        assert!(matches!(
            f.receiver.ingest(&body, None).await,
            Err(IngestError::Authentication(_))
        ));
        assert!(!f.ledger.contains("evt-1").await.unwrap());
        assert_eq!(f.handle.queue_depth(), 0);
    }

    #[tokio::test]
    async fn unsigned_payload_accepted_without_secret() {
        let f = fixture(WebhookConfig::disabled()).await;
        assert!(!f.receiver.verification_enabled());
        let body = body(json!({"event_id": "evt-1", "network": "SOL", "tx_hash": "sig"}));
        assert!(matches!(
            f.receiver.ingest(&body, None).await.unwrap(),
            IngestOutcome::Received(_)
        ));
    }

    #[tokio::test]
    async fn validation_failures() {
        let f = fixture(WebhookConfig::disabled()).await;
        for raw in [
            b"{not json".to_vec(),
            b"[1, 2]".to_vec(),
            body(json!({"network": "ETH"})),
            body(json!({"event_id": "evt-1", "network": "XRP", "tx_hash": "x"})),
            body(json!({"event_id": "evt-2", "network": "ETH", "tx_hash": "x", "confirmations": "three"})),
        ] {
            assert!(matches!(
                f.receiver.ingest(&raw, None).await,
                Err(IngestError::Validation(_))
            ));
        }
        assert_eq!(f.handle.queue_depth(), 0);
        assert!(!f.ledger.contains("evt-1").await.unwrap());
    }

    #[tokio::test]
    async fn known_event_id_short_circuits_before_parsing() {
        let f = fixture(WebhookConfig::disabled()).await;
        let good = body(json!({"event_id": "evt-1", "network": "ETH", "tx_hash": "0x1"}));
        f.receiver.ingest(&good, None).await.unwrap();

        // Same id, payload that would no longer parse.
        let odd = body(json!({"event_id": "evt-1", "network": "???"}));
        assert!(matches!(
            f.receiver.ingest(&odd, None).await.unwrap(),
            IngestOutcome::Duplicate { .. }
        ));
    }
}

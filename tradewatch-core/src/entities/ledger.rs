//! Event ledger: every accepted webhook and whether it has been processed.
//!
//! The receiver consults the ledger for idempotency and records the
//! normalized event in the same write that claims its id. The processor
//! stamps `processed_at` once an event has been applied.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tradewatch_sdk::objects::Network;

use crate::events::Event;
use crate::storage::{JsonDocument, StoreError};

/// A normalized, accepted webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookRecord {
    pub event_id: String,
    pub network: Network,
    pub trade_id: String,
    pub tx_hash: String,
    pub confirmation_count: u64,
    pub timestamp: String,
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

impl WebhookRecord {
    pub fn to_event(&self) -> Event {
        Event {
            event_id: self.event_id.clone(),
            trade_id: self.trade_id.clone(),
            tx_hash: self.tx_hash.clone(),
            confirmation_count: self.confirmation_count,
            timestamp: self.timestamp.clone(),
            event_type: self.event_type.clone(),
            data: self.data.clone(),
            retry_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// `None` for events enqueued without passing through the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<WebhookRecord>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub processed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventLedger {
    #[serde(default)]
    pub entries: BTreeMap<String, LedgerEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    Duplicate,
}

#[derive(Debug)]
pub struct LedgerStore {
    document: JsonDocument<EventLedger>,
}

impl LedgerStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            document: JsonDocument::open(path).await?,
        })
    }

    /// Whether the event id has been seen before.
    pub async fn contains(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.document.read().await?.entries.contains_key(event_id))
    }

    /// Claim the record's event id and persist the record in one write.
    pub async fn accept(&self, record: WebhookRecord) -> Result<Acceptance, StoreError> {
        self.document
            .update(move |ledger| {
                if ledger.entries.contains_key(&record.event_id) {
                    return Acceptance::Duplicate;
                }
                ledger.entries.insert(
                    record.event_id.clone(),
                    LedgerEntry {
                        record: Some(record),
                        processed_at: None,
                    },
                );
                Acceptance::Accepted
            })
            .await
    }

    pub async fn mark_processed(
        &self,
        event_id: &str,
        now: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.document
            .update(|ledger| {
                let entry = ledger
                    .entries
                    .entry(event_id.to_owned())
                    .or_insert(LedgerEntry {
                        record: None,
                        processed_at: None,
                    });
                entry.processed_at.get_or_insert(now);
            })
            .await
    }

    pub async fn is_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .document
            .read()
            .await?
            .entries
            .get(event_id)
            .is_some_and(|e| e.processed_at.is_some()))
    }

    pub async fn processed_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .document
            .read()
            .await?
            .entries
            .values()
            .filter(|e| e.processed_at.is_some())
            .count())
    }

    /// Accepted records that were never processed, oldest first.
    pub async fn unprocessed(&self) -> Result<Vec<WebhookRecord>, StoreError> {
        let ledger = self.document.read().await?;
        let mut records: Vec<WebhookRecord> = ledger
            .entries
            .into_values()
            .filter(|e| e.processed_at.is_none())
            .filter_map(|e| e.record)
            .collect();
        records.sort_by_key(|r| r.received_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> WebhookRecord {
        WebhookRecord {
            event_id: id.into(),
            network: Network::Btc,
            trade_id: "trade-1".into(),
            tx_hash: "ff00".into(),
            confirmation_count: 1,
            timestamp: String::new(),
            event_type: "transaction".into(),
            data: json!({"fee": 120}),
            received_at: OffsetDateTime::now_utc(),
        }
    }

    async fn ledger() -> (tempfile::TempDir, LedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("ledger.json")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn second_accept_is_duplicate() {
        let (_dir, ledger) = ledger().await;
        assert_eq!(ledger.accept(record("e1")).await.unwrap(), Acceptance::Accepted);
        assert_eq!(ledger.accept(record("e1")).await.unwrap(), Acceptance::Duplicate);
        assert!(ledger.contains("e1").await.unwrap());
        assert!(!ledger.contains("e2").await.unwrap());
    }

    #[tokio::test]
    async fn processing_is_tracked() {
        let (_dir, ledger) = ledger().await;
        ledger.accept(record("e1")).await.unwrap();
        ledger.accept(record("e2")).await.unwrap();
        assert_eq!(ledger.processed_count().await.unwrap(), 0);
        assert_eq!(ledger.unprocessed().await.unwrap().len(), 2);

        ledger.mark_processed("e1", OffsetDateTime::now_utc()).await.unwrap();
        assert!(ledger.is_processed("e1").await.unwrap());
        assert!(!ledger.is_processed("e2").await.unwrap());
        assert_eq!(ledger.processed_count().await.unwrap(), 1);

        let pending = ledger.unprocessed().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id, "e2");
    }

    #[tokio::test]
    async fn directly_enqueued_events_are_counted() {
        let (_dir, ledger) = ledger().await;
        ledger.mark_processed("direct", OffsetDateTime::now_utc()).await.unwrap();
        assert!(ledger.is_processed("direct").await.unwrap());
        assert!(ledger.unprocessed().await.unwrap().is_empty());
    }

    #[test]
    fn record_converts_to_fresh_event() {
        let event = record("e1").to_event();
        assert_eq!(event.retry_count, 0);
        assert_eq!(event.data["fee"], 120);
        assert_eq!(event.trade_id, "trade-1");
    }
}

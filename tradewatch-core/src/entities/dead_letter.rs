//! Dead-letter store for events that exhausted their processing attempts.
//!
//! Entries are `parked` until an operator replays them. A replay moves the
//! entry to `replaying` and re-enqueues the event; success removes the entry
//! and another failure parks it again with the new error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::events::Event;
use crate::storage::{JsonDocument, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadLetterState {
    Parked,
    Replaying,
}

fn parked() -> DeadLetterState {
    DeadLetterState::Parked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub event_id: String,
    pub trade_id: String,
    pub error_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Processing attempts consumed by the failure that parked this entry.
    pub retry_count: u32,
    pub original_event: Event,
    #[serde(default = "parked")]
    pub state: DeadLetterState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeadLetterBook {
    #[serde(default)]
    pub failed_events: Vec<DeadLetterEntry>,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no dead-letter entry for event {0}")]
    NotFound(String),
    #[error("event {0} is already being replayed")]
    AlreadyReplaying(String),
    #[error("event queue closed")]
    QueueClosed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct DeadLetterStore {
    document: JsonDocument<DeadLetterBook>,
}

impl DeadLetterStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            document: JsonDocument::open(path).await?,
        })
    }

    /// Park `event` with the failure that exhausted it. A replaying entry for
    /// the same event id is replaced.
    pub async fn park(
        &self,
        event: &Event,
        error_message: &str,
        attempts: u32,
        now: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let entry = DeadLetterEntry {
            event_id: event.event_id.clone(),
            trade_id: event.trade_id.clone(),
            error_message: error_message.to_owned(),
            timestamp: now,
            retry_count: attempts,
            original_event: event.clone(),
            state: DeadLetterState::Parked,
        };
        self.document
            .update(move |book| {
                book.failed_events.retain(|e| e.event_id != entry.event_id);
                book.failed_events.push(entry);
            })
            .await
    }

    /// Entries awaiting operator action, oldest first.
    pub async fn parked(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        self.in_state(DeadLetterState::Parked).await
    }

    pub async fn replaying(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        self.in_state(DeadLetterState::Replaying).await
    }

    async fn in_state(&self, state: DeadLetterState) -> Result<Vec<DeadLetterEntry>, StoreError> {
        let mut book = self.document.read().await?;
        book.failed_events.retain(|e| e.state == state);
        Ok(book.failed_events)
    }

    /// Mark a parked entry as replaying and return the event to re-enqueue,
    /// with its replay counter bumped.
    pub async fn begin_replay(&self, event_id: &str) -> Result<Event, ReplayError> {
        self.document
            .try_update(|book| {
                let entry = book
                    .failed_events
                    .iter_mut()
                    .find(|e| e.event_id == event_id)
                    .ok_or_else(|| ReplayError::NotFound(event_id.to_owned()))?;
                if entry.state == DeadLetterState::Replaying {
                    return Err(ReplayError::AlreadyReplaying(event_id.to_owned()));
                }
                entry.state = DeadLetterState::Replaying;
                entry.original_event.retry_count += 1;
                Ok(entry.original_event.clone())
            })
            .await
    }

    /// Return a replaying entry to `parked` when its event never made it onto
    /// the queue.
    pub async fn abort_replay(&self, event_id: &str) -> Result<(), StoreError> {
        self.document
            .update(|book| {
                if let Some(entry) = book
                    .failed_events
                    .iter_mut()
                    .find(|e| e.event_id == event_id && e.state == DeadLetterState::Replaying)
                {
                    entry.state = DeadLetterState::Parked;
                    entry.original_event.retry_count = entry.original_event.retry_count.saturating_sub(1);
                }
            })
            .await
    }

    /// Drop the entry for a successfully processed event, whatever its
    /// state. Returns whether an entry was removed.
    pub async fn resolve(&self, event_id: &str) -> Result<bool, StoreError> {
        let book = self.document.read().await?;
        if !book.failed_events.iter().any(|e| e.event_id == event_id) {
            return Ok(false);
        }
        self.document
            .update(|book| {
                let before = book.failed_events.len();
                book.failed_events.retain(|e| e.event_id != event_id);
                book.failed_events.len() != before
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str) -> Event {
        Event {
            event_id: id.into(),
            trade_id: "trade-1".into(),
            tx_hash: "0xabc".into(),
            confirmation_count: 2,
            timestamp: String::new(),
            event_type: "transaction".into(),
            data: json!({"from": "0x1"}),
            retry_count: 0,
        }
    }

    async fn store() -> (tempfile::TempDir, DeadLetterStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DeadLetterStore::open(dir.path().join("dead_letters.json"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn park_records_failure_details() {
        let (_dir, store) = store().await;
        store
            .park(&event("e1"), "disk full", 5, OffsetDateTime::now_utc())
            .await
            .unwrap();
        let parked = store.parked().await.unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].retry_count, 5);
        assert_eq!(parked[0].error_message, "disk full");
        assert_eq!(parked[0].original_event, event("e1"));
    }

    #[tokio::test]
    async fn replay_lifecycle() {
        let (_dir, store) = store().await;
        store
            .park(&event("e1"), "boom", 5, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let replayed = store.begin_replay("e1").await.unwrap();
        assert_eq!(replayed.retry_count, 1);
        assert!(store.parked().await.unwrap().is_empty());
        assert_eq!(store.replaying().await.unwrap().len(), 1);

        assert!(matches!(
            store.begin_replay("e1").await,
            Err(ReplayError::AlreadyReplaying(_))
        ));

        // Second failure parks it again with the bumped counter.
        store
            .park(&replayed, "boom again", 5, OffsetDateTime::now_utc())
            .await
            .unwrap();
        let parked = store.parked().await.unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].error_message, "boom again");
        assert_eq!(parked[0].original_event.retry_count, 1);

        store.begin_replay("e1").await.unwrap();
        assert!(store.resolve("e1").await.unwrap());
        assert!(store.parked().await.unwrap().is_empty());
        assert!(store.replaying().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_removes_entry_in_any_state() {
        let (_dir, store) = store().await;
        let now = OffsetDateTime::now_utc();
        store.park(&event("e1"), "boom", 5, now).await.unwrap();
        store.park(&event("e2"), "boom", 5, now).await.unwrap();
        store.begin_replay("e2").await.unwrap();

        assert!(store.resolve("e1").await.unwrap());
        assert!(store.resolve("e2").await.unwrap());
        assert!(!store.resolve("e3").await.unwrap());
        assert!(store.parked().await.unwrap().is_empty());
        assert!(store.replaying().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abort_replay_restores_parked_state() {
        let (_dir, store) = store().await;
        store
            .park(&event("e1"), "boom", 5, OffsetDateTime::now_utc())
            .await
            .unwrap();
        store.begin_replay("e1").await.unwrap();
        store.abort_replay("e1").await.unwrap();
        let parked = store.parked().await.unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].original_event.retry_count, 0);
    }

    #[tokio::test]
    async fn unknown_event_cannot_be_replayed() {
        let (_dir, store) = store().await;
        assert!(matches!(
            store.begin_replay("missing").await,
            Err(ReplayError::NotFound(_))
        ));
    }
}

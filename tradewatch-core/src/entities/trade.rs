//! Trades and their confirmation state machine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tradewatch_sdk::objects::{EventSummary, TradeStatus};

use crate::events::Event;
use crate::storage::{JsonDocument, StoreError};

/// A trade tracked by the pipeline, keyed externally by its trade id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub status: TradeStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub confirmed_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub failed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Highest confirmation count seen so far; never decreases.
    pub confirmations: u64,
    /// Applied events in application order.
    #[serde(default)]
    pub events: Vec<EventSummary>,
}

/// Result of applying an event to a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event id was already in the trade's history.
    Duplicate,
    Updated { from: TradeStatus, to: TradeStatus },
}

#[derive(Debug, Error)]
pub enum MarkFailedError {
    #[error("trade not found: {0}")]
    NotFound(String),
    #[error("trade {0} is already completed")]
    AlreadyCompleted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Trade {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            status: TradeStatus::Pending,
            created_at: now,
            confirmed_at: None,
            completed_at: None,
            failed_at: None,
            failure_reason: None,
            confirmations: 0,
            events: Vec::new(),
        }
    }

    pub fn has_event(&self, event_id: &str) -> bool {
        self.events.iter().any(|e| e.event_id == event_id)
    }

    /// Apply one event.
    ///
    /// Confirmations only ever grow. A pending trade becomes confirmed once
    /// it reaches `threshold`; a confirmed trade completes on a finality
    /// event. Events against completed or failed trades are recorded without
    /// touching the status.
    pub fn apply(&mut self, event: &Event, threshold: u64, now: OffsetDateTime) -> Applied {
        if self.has_event(&event.event_id) {
            return Applied::Duplicate;
        }

        let from = self.status;
        self.confirmations = self.confirmations.max(event.confirmation_count);
        self.events.push(event.summary());

        if self.status == TradeStatus::Pending && self.confirmations >= threshold {
            self.status = TradeStatus::Confirmed;
            self.confirmed_at = Some(now);
        }
        if self.status == TradeStatus::Confirmed && event.is_finality() {
            self.status = TradeStatus::Completed;
            self.completed_at = Some(now);
        }

        Applied::Updated {
            from,
            to: self.status,
        }
    }

    /// Move the trade to `Failed`. Returns whether anything changed; failing
    /// an already failed trade is a no-op.
    pub fn mark_failed(
        &mut self,
        trade_id: &str,
        reason: &str,
        now: OffsetDateTime,
    ) -> Result<bool, MarkFailedError> {
        match self.status {
            TradeStatus::Failed => Ok(false),
            TradeStatus::Completed => Err(MarkFailedError::AlreadyCompleted(trade_id.to_owned())),
            TradeStatus::Pending | TradeStatus::Confirmed => {
                self.status = TradeStatus::Failed;
                self.failed_at = Some(now);
                self.failure_reason = Some(reason.to_owned());
                Ok(true)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Persistent trade storage.
///
/// The processor serializes read-modify-write cycles itself; implementations
/// only need each call to be atomic.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn get(&self, trade_id: &str) -> Result<Option<Trade>, StoreError>;

    async fn put(&self, trade_id: &str, trade: &Trade) -> Result<(), StoreError>;

    async fn all(&self) -> Result<BTreeMap<String, Trade>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TradeBook {
    #[serde(default)]
    pub trades: BTreeMap<String, Trade>,
}

/// [`TradeRepository`] backed by a single JSON document.
#[derive(Debug)]
pub struct JsonTradeRepository {
    document: JsonDocument<TradeBook>,
}

impl JsonTradeRepository {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            document: JsonDocument::open(path).await?,
        })
    }
}

#[async_trait]
impl TradeRepository for JsonTradeRepository {
    async fn get(&self, trade_id: &str) -> Result<Option<Trade>, StoreError> {
        Ok(self.document.read().await?.trades.remove(trade_id))
    }

    async fn put(&self, trade_id: &str, trade: &Trade) -> Result<(), StoreError> {
        let trade = trade.clone();
        self.document
            .update(move |book| {
                book.trades.insert(trade_id.to_owned(), trade);
            })
            .await
    }

    async fn all(&self) -> Result<BTreeMap<String, Trade>, StoreError> {
        Ok(self.document.read().await?.trades)
    }
}

//! EventProcessor.
//!
//! The EventProcessor is responsible for:
//! - Draining the event queue one event at a time
//! - Applying each event to its trade under bounded exponential retry
//! - Parking events that exhaust their attempts in the dead-letter store
//! - Marking processed events in the ledger
//!
//! Operators and the receiver talk to it through a cloneable
//! [`ProcessorHandle`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use tradewatch_sdk::objects::MetricsSnapshot;

use crate::config::ProcessorConfig;
use crate::entities::{
    Applied, DeadLetterEntry, DeadLetterStore, LedgerStore, MarkFailedError, ReplayError, Trade,
    TradeRepository,
};
use crate::events::{Event, EventReceiver, EventSender, event_channel};
use crate::monitoring;
use crate::storage::StoreError;

/// Errors raised by a single processing attempt.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("event {0} carries no trade id")]
    MissingTradeId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The event queue no longer has a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue closed")]
pub struct QueueClosed;

struct Exhausted {
    attempts: u32,
    error: ProcessingError,
    interrupted: bool,
}

struct ProcessorState {
    config: ProcessorConfig,
    trades: Arc<dyn TradeRepository>,
    dead_letters: DeadLetterStore,
    ledger: Arc<LedgerStore>,
    /// Serializes read-modify-write cycles on trades.
    trade_lock: Mutex<()>,
    queue_tx: EventSender,
    processed_tx: watch::Sender<u64>,
}

/// EventProcessor consumes the event queue.
pub struct EventProcessor {
    state: Arc<ProcessorState>,
    event_rx: EventReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

/// Cloneable access to a running [`EventProcessor`].
#[derive(Clone)]
pub struct ProcessorHandle {
    state: Arc<ProcessorState>,
}

impl EventProcessor {
    /// Create a new EventProcessor and its handle.
    ///
    /// # Arguments
    ///
    /// * `config` - Threshold, queue capacity and retry policy
    /// * `trades` - Trade repository
    /// * `dead_letters` - Dead-letter store
    /// * `ledger` - Event ledger shared with the receiver
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        config: ProcessorConfig,
        trades: Arc<dyn TradeRepository>,
        dead_letters: DeadLetterStore,
        ledger: Arc<LedgerStore>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, ProcessorHandle) {
        let (queue_tx, event_rx) = event_channel(config.queue_capacity);
        let (processed_tx, _) = watch::channel(0);
        let state = Arc::new(ProcessorState {
            config,
            trades,
            dead_letters,
            ledger,
            trade_lock: Mutex::new(()),
            queue_tx,
            processed_tx,
        });
        let handle = ProcessorHandle {
            state: state.clone(),
        };
        (
            Self {
                state,
                event_rx,
                shutdown_rx,
            },
            handle,
        )
    }

    /// Run the EventProcessor until shutdown is signalled.
    ///
    /// An event whose retries are still backing off when shutdown arrives is
    /// parked in the dead-letter store so it can be replayed later.
    pub async fn run(mut self) {
        info!(
            threshold = self.state.config.confirmation_threshold,
            max_attempts = self.state.config.retry.max_attempts,
            "EventProcessor started"
        );

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = stop_requested(&mut self.shutdown_rx) => {
                    info!("EventProcessor received shutdown signal");
                    break;
                }

                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event queue closed");
                        break;
                    };
                    debug!(event_id = %event.event_id, trade_id = %event.trade_id, "Received event");
                    self.handle_event(event).await;
                }
            }
        }

        info!(
            remaining = self.event_rx.len(),
            "EventProcessor shutdown complete"
        );
    }

    async fn handle_event(&mut self, event: Event) {
        let failure = match self.process_with_retry(&event).await {
            Ok(()) => return,
            Err(failure) => failure,
        };

        let message = if failure.interrupted {
            format!("{} (retries interrupted by shutdown)", failure.error)
        } else {
            failure.error.to_string()
        };
        error!(
            event_id = %event.event_id,
            trade_id = %event.trade_id,
            attempts = failure.attempts,
            error = %message,
            "Event failed, moving to dead-letter store"
        );
        if let Err(e) = self
            .state
            .dead_letters
            .park(&event, &message, failure.attempts, OffsetDateTime::now_utc())
            .await
        {
            error!(event_id = %event.event_id, error = %e, "Failed to write dead-letter entry");
        }
    }

    async fn process_with_retry(&mut self, event: &Event) -> Result<(), Exhausted> {
        let policy = self.state.config.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.state.process_event(event).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if attempt >= policy.max_attempts {
                return Err(Exhausted {
                    attempts: attempt,
                    error,
                    interrupted: false,
                });
            }

            let delay = policy.delay_after(attempt);
            warn!(
                event_id = %event.event_id,
                attempt,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Event processing failed, retrying"
            );
            tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown_rx) => {
                    return Err(Exhausted {
                        attempts: attempt,
                        error,
                        interrupted: true,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Resolves once shutdown has been requested or the sender is gone.
async fn stop_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

impl ProcessorState {
    /// One processing attempt.
    async fn process_event(&self, event: &Event) -> Result<(), ProcessingError> {
        if event.trade_id.is_empty() {
            return Err(ProcessingError::MissingTradeId(event.event_id.clone()));
        }

        let now = OffsetDateTime::now_utc();
        let applied = {
            let _guard = self.trade_lock.lock().await;
            let mut trade = self
                .trades
                .get(&event.trade_id)
                .await?
                .unwrap_or_else(|| Trade::new(now));
            let applied = trade.apply(event, self.config.confirmation_threshold, now);
            if applied != Applied::Duplicate {
                self.trades.put(&event.trade_id, &trade).await?;
            }
            applied
        };

        // Entry first: an unprocessed event without one is requeued on restart.
        if self.dead_letters.resolve(&event.event_id).await? {
            info!(event_id = %event.event_id, replay = event.retry_count, "Dead-lettered event succeeded");
        }
        self.ledger.mark_processed(&event.event_id, now).await?;
        self.processed_tx.send_modify(|n| *n += 1);

        match applied {
            Applied::Duplicate => {
                debug!(event_id = %event.event_id, "Event already applied to trade");
            }
            Applied::Updated { from, to } if from != to => {
                info!(
                    trade_id = %event.trade_id,
                    event_id = %event.event_id,
                    from = %from,
                    to = %to,
                    "Trade status changed"
                );
            }
            Applied::Updated { .. } => {
                debug!(
                    trade_id = %event.trade_id,
                    event_id = %event.event_id,
                    confirmations = event.confirmation_count,
                    "Event applied"
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

impl ProcessorHandle {
    /// Push an event onto the queue, waiting for room when it is full.
    pub async fn enqueue(&self, event: Event) -> Result<(), QueueClosed> {
        self.state.queue_tx.send(event).await.map_err(|_| QueueClosed)
    }

    /// Re-enqueue work interrupted by a restart. Returns how many events
    /// were queued.
    ///
    /// Replays that were in flight resume with their stored event. Accepted
    /// events that were never processed are queued again, except those
    /// parked in the dead-letter store, which wait for an operator.
    pub async fn requeue_unprocessed(&self) -> Result<usize, ReplayError> {
        let parked: HashSet<String> = self
            .state
            .dead_letters
            .parked()
            .await?
            .into_iter()
            .map(|e| e.event_id)
            .collect();
        let mut events: Vec<Event> = self
            .state
            .dead_letters
            .replaying()
            .await?
            .into_iter()
            .map(|e| e.original_event)
            .collect();
        let in_flight: HashSet<String> = events.iter().map(|e| e.event_id.clone()).collect();

        events.extend(
            self.state
                .ledger
                .unprocessed()
                .await?
                .into_iter()
                .filter(|r| !parked.contains(&r.event_id) && !in_flight.contains(&r.event_id))
                .map(|r| r.to_event()),
        );

        let count = events.len();
        for event in events {
            debug!(event_id = %event.event_id, replay = event.retry_count, "Requeueing event");
            self.enqueue(event)
                .await
                .map_err(|_| ReplayError::QueueClosed)?;
        }
        Ok(count)
    }

    pub async fn trade(&self, trade_id: &str) -> Result<Option<Trade>, StoreError> {
        self.state.trades.get(trade_id).await
    }

    pub async fn trades(&self) -> Result<BTreeMap<String, Trade>, StoreError> {
        self.state.trades.all().await
    }

    /// Operator action: fail a pending or confirmed trade.
    pub async fn mark_trade_failed(
        &self,
        trade_id: &str,
        reason: &str,
    ) -> Result<Trade, MarkFailedError> {
        let _guard = self.state.trade_lock.lock().await;
        let mut trade = self
            .state
            .trades
            .get(trade_id)
            .await?
            .ok_or_else(|| MarkFailedError::NotFound(trade_id.to_owned()))?;
        if trade.mark_failed(trade_id, reason, OffsetDateTime::now_utc())? {
            self.state.trades.put(trade_id, &trade).await?;
            info!(trade_id, reason, "Trade marked failed");
        }
        Ok(trade)
    }

    /// Parked dead-letter entries.
    pub async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        self.state.dead_letters.parked().await
    }

    /// Entries currently being replayed.
    pub async fn replaying(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        self.state.dead_letters.replaying().await
    }

    /// Re-enqueue one parked event with its replay counter bumped.
    pub async fn replay_dead_letter(&self, event_id: &str) -> Result<Event, ReplayError> {
        let event = self.state.dead_letters.begin_replay(event_id).await?;
        if self.enqueue(event.clone()).await.is_err() {
            self.state.dead_letters.abort_replay(event_id).await?;
            return Err(ReplayError::QueueClosed);
        }
        info!(event_id, replay = event.retry_count, "Dead-letter event re-enqueued");
        Ok(event)
    }

    /// Replay every parked entry. Returns how many were re-enqueued.
    pub async fn sweep_dead_letters(&self) -> Result<usize, ReplayError> {
        let parked = self.state.dead_letters.parked().await?;
        let mut replayed = 0;
        for entry in parked {
            match self.replay_dead_letter(&entry.event_id).await {
                Ok(_) => replayed += 1,
                // Raced with an operator replaying the same entry.
                Err(ReplayError::NotFound(_) | ReplayError::AlreadyReplaying(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(replayed)
    }

    /// Events waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.state.queue_tx.max_capacity() - self.state.queue_tx.capacity()
    }

    pub async fn processed_count(&self) -> Result<usize, StoreError> {
        self.state.ledger.processed_count().await
    }

    /// Wait until `event_id` has been processed. Returns `false` on timeout.
    pub async fn wait_until_processed(
        &self,
        event_id: &str,
        timeout: Duration,
    ) -> Result<bool, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut processed_rx = self.state.processed_tx.subscribe();
        loop {
            if self.state.ledger.is_processed(event_id).await? {
                return Ok(true);
            }
            match tokio::time::timeout_at(deadline, processed_rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => {
                    warn!(event_id, timeout_ms = timeout.as_millis() as u64, "Timed out waiting for event");
                    return Ok(false);
                }
            }
        }
    }

    /// Build a metrics snapshot from the stores and the queue.
    pub async fn metrics(&self) -> Result<MetricsSnapshot, StoreError> {
        let trades = self.trades().await?;
        let dead_letter_count = self.state.dead_letters.parked().await?.len();
        let processed_count = self.processed_count().await?;
        Ok(monitoring::collect(
            &trades,
            monitoring::PipelineCounters {
                queue_depth: self.queue_depth(),
                processed_count,
                dead_letter_count,
            },
            OffsetDateTime::now_utc(),
        ))
    }
}

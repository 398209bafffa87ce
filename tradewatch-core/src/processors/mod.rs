//! Processors of the confirmation pipeline.
//!
//! - `WebhookReceiver`: authenticates and normalizes webhooks, feeds the queue
//! - `EventProcessor`: drains the queue and drives the trade state machine

pub mod event_processor;
pub mod payload;
pub mod webhook_receiver;

pub use event_processor::{EventProcessor, ProcessingError, ProcessorHandle, QueueClosed};
pub use payload::PayloadError;
pub use webhook_receiver::{IngestError, IngestOutcome, WebhookReceiver};

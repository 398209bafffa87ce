//! Events flowing from the webhook receiver to the event processor.
//!
//! # Event Flow
//!
//! 1. A chain monitor POSTs a webhook; the receiver authenticates it,
//!    normalizes it into an [`Event`] and records it in the ledger.
//! 2. The event is pushed onto the bounded queue.
//! 3. The event processor drains the queue one event at a time and applies
//!    it to the trade it belongs to.
//!
//! Events are idempotent: each carries a unique `event_id` and applying the
//! same id twice is a no-op.

pub mod channels;
pub mod types;

pub use channels::{DEFAULT_CHANNEL_BUFFER, EventReceiver, EventSender, event_channel};
pub use types::Event;

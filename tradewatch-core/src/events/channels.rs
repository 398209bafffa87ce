//! Event channel factories and handles.

use super::types::Event;
use tokio::sync::mpsc;

/// Default buffer size for the event queue.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 1024;

/// Sender handle for normalized events.
pub type EventSender = mpsc::Sender<Event>;
/// Receiver handle for normalized events.
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create a new event channel holding at most `buffer` events.
///
/// A zero buffer is raised to one.
pub fn event_channel(buffer: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer.max(1))
}

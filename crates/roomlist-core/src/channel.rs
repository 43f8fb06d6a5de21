use tokio::sync::broadcast;

use crate::types::RoomListEvent;

/// Broadcast event stream type used by room list subscribers.
pub type EventStream = broadcast::Receiver<RoomListEvent>;

const DEFAULT_EVENT_BUFFER: usize = 256;

/// Fan-out channel carrying room list notifications.
#[derive(Clone, Debug)]
pub struct RoomListChannels {
    event_tx: broadcast::Sender<RoomListEvent>,
}

impl Default for RoomListChannels {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl RoomListChannels {
    /// Create a channel with the given per-subscriber buffer.
    pub fn new(event_buffer: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));
        Self { event_tx }
    }

    /// Subscribe to emitted room list events.
    pub fn subscribe(&self) -> EventStream {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; with no subscribers the event is dropped.
    pub fn emit(&self, event: RoomListEvent) {
        let _ = self.event_tx.send(event);
    }
}

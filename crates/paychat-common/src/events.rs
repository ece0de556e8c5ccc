use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Observable changes in a chat session, published for whatever renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    BusyChanged(bool),
    RecordAppended { id: String, role: String },
    LogCleared,
    IdentityChanged { session_id: String, tier: String },
    LimitsRefreshed { tier: String },
    ErrorRaised(String),
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Returns the number of receivers that got the event (0 when nobody listens).
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

//! Broadcast bus carrying store notifications.

use alphamind_rs_config::Settings;
use alphamind_rs_protocol::{FileStatus, Message};
use log::debug;
use tokio::sync::broadcast;

/// Default channel capacity for a new bus.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Which store emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Agents,
    Chat,
    Data,
    Settings,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Agents => "agents",
            StoreKind::Chat => "chat",
            StoreKind::Data => "data",
            StoreKind::Settings => "settings",
        }
    }
}

/// Notifications observers can subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A store recorded an error.
    Error { store: StoreKind, message: String },
    /// A user message was appended to a conversation.
    MessageSent {
        conversation_id: String,
        message: Message,
    },
    /// An assistant reply arrived.
    MessageReceived {
        conversation_id: String,
        message: Message,
    },
    SettingsChanged(Box<Settings>),
    FileStatusChanged { file_id: String, status: FileStatus },
}

/// Broadcast-backed event bus shared by all stores of a workspace.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("store event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Emit an event; dropped silently when nobody listens.
    pub fn emit(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

//! Chat store: conversations, message sending and cancellation.
//!
//! At most one send is in flight. A send is registered under a generation
//! number; its reply is applied only while that generation is still the
//! registered one, so a reply that arrives after [`ChatStore::cancel`] and a
//! newer send is dropped.

use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent, StoreKind};
use crate::state::{StateCell, StatusTracker, StoreStatus};
use crate::transport::Endpoint;
use alphamind_rs_config::ChatConfig;
use alphamind_rs_protocol::{
    ChatReply, ChatRequest, Conversation, ConversationStatus, Message, Transport, TransportError,
};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Assistant content used when the backend reply has no message.
pub const EMPTY_REPLY_TEXT: &str = "I apologize, but I couldn't generate a response.";
/// Assistant content appended when a send fails.
pub const SEND_FAILED_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Snapshot of all conversations and the current selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub conversations: Vec<Conversation>,
    pub current_id: Option<String>,
}

impl ChatState {
    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == id)
    }

    /// The selected conversation, if the selection names a known one.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_id
            .as_deref()
            .and_then(|id| self.conversation(id))
    }

    /// Messages of the current conversation; empty when none is selected.
    pub fn messages(&self) -> &[Message] {
        self.current_conversation()
            .map(|conversation| conversation.messages.as_slice())
            .unwrap_or_default()
    }

    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| conversation.id == id)
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Registration of one send; unregisters itself on drop.
struct FlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
    generation: u64,
    token: CancellationToken,
}

impl FlightGuard<'_> {
    fn is_current(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|flight| flight.generation == self.generation)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot
            .as_ref()
            .is_some_and(|flight| flight.generation == self.generation)
        {
            *slot = None;
        }
    }
}

pub struct ChatStore {
    endpoint: Endpoint,
    agent_id: Option<String>,
    history_window: usize,
    state: StateCell<ChatState>,
    status: StatusTracker,
    events: EventBus,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

impl ChatStore {
    /// Create a store with one empty conversation selected.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_path: &str,
        config: &ChatConfig,
        events: EventBus,
    ) -> Self {
        let initial = Conversation::new(config.initial_title.clone(), config.agent_id.clone());
        let state = ChatState {
            current_id: Some(initial.id.clone()),
            conversations: vec![initial],
        };
        Self {
            endpoint: Endpoint::new(transport, base_path),
            agent_id: config.agent_id.clone(),
            history_window: config.history_window,
            state: StateCell::new(state),
            status: StatusTracker::new(StoreKind::Chat, events.clone()),
            events,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ChatState {
        self.state.get()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.read(|state| state.conversations.clone())
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.state
            .read(|state| state.current_conversation().cloned())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.read(|state| state.messages().to_vec())
    }

    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    /// Whether a send is registered and not cancelled.
    pub fn is_sending(&self) -> bool {
        self.in_flight
            .lock()
            .as_ref()
            .is_some_and(|flight| !flight.token.is_cancelled())
    }

    /// Send a user message to the current conversation and append the reply.
    ///
    /// No-op for blank content, while another send is in flight, or when no
    /// conversation is selected. Transport failures append an error message
    /// to the conversation and are returned. Cancellation is silent.
    pub async fn send_message(&self, content: &str) -> Result<(), StoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        let window = self.history_window;
        let Some((conversation_id, history)) = self.state.read(|state| {
            state
                .current_conversation()
                .map(|conversation| (conversation.id.clone(), conversation.history(window).to_vec()))
        }) else {
            debug!("send ignored, no conversation selected");
            return Ok(());
        };
        let Some(flight) = self.begin_send() else {
            debug!("send ignored, another send is in flight");
            return Ok(());
        };

        let request = ChatRequest {
            message: content.to_string(),
            conversation_id: conversation_id.clone(),
            agent_id: self.agent_id.clone(),
            history,
        };
        let body = serde_json::to_value(&request)?;

        let user_message = Message::user(content);
        self.append(&conversation_id, user_message.clone());
        self.events.emit(StoreEvent::MessageSent {
            conversation_id: conversation_id.clone(),
            message: user_message,
        });

        let _loading = self.status.begin();
        let outcome = tokio::select! {
            _ = flight.token.cancelled() => Err(TransportError::Cancelled),
            reply = self.endpoint.fetch::<ChatReply>(self.endpoint.post("").with_json(body)) => reply,
        };
        if !flight.is_current() {
            debug!(
                "dropping reply of superseded send (conversation={}, generation={})",
                conversation_id, flight.generation
            );
            return Ok(());
        }

        match outcome {
            Ok(reply) => {
                let text = reply
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string());
                let message = Message::assistant(text).with_metadata(reply.metadata);
                self.append(&conversation_id, message.clone());
                self.events.emit(StoreEvent::MessageReceived {
                    conversation_id,
                    message,
                });
                Ok(())
            }
            Err(TransportError::Cancelled) => {
                debug!("send cancelled (conversation={})", conversation_id);
                Ok(())
            }
            Err(err) => {
                self.status.record("send_message", &err);
                self.append(&conversation_id, Message::assistant_error(SEND_FAILED_TEXT));
                Err(err.into())
            }
        }
    }

    /// Resend the content of the most recent user message in the current
    /// conversation.
    pub async fn retry_last_message(&self) -> Result<(), StoreError> {
        let last = self.state.read(|state| {
            state
                .current_conversation()
                .and_then(Conversation::last_user_message)
                .map(|message| message.content.clone())
        });
        match last {
            Some(content) => self.send_message(&content).await,
            None => Ok(()),
        }
    }

    /// Cancel the in-flight send, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(flight) if !flight.token.is_cancelled() => {
                flight.token.cancel();
                info!("chat send cancelled (generation={})", flight.generation);
                true
            }
            _ => false,
        }
    }

    /// Create and select a new conversation. Returns its id.
    pub fn create_conversation(&self, title: Option<&str>) -> String {
        self.state.update(|state| {
            let title = title
                .map(str::to_string)
                .unwrap_or_else(|| format!("Conversation {}", state.conversations.len() + 1));
            let conversation = Conversation::new(title, self.agent_id.clone());
            let id = conversation.id.clone();
            state.conversations.push(conversation);
            state.current_id = Some(id.clone());
            debug!("conversation created (id={})", id);
            id
        })
    }

    /// Select a conversation and clear the error. Unknown ids select nothing.
    pub fn switch_conversation(&self, id: &str) {
        self.state
            .update(|state| state.current_id = Some(id.to_string()));
        self.status.clear_error();
    }

    /// Delete a conversation. Deleting the current one selects the first
    /// remaining conversation, or none.
    pub fn delete_conversation(&self, id: &str) {
        self.state.update_if(|state| {
            let before = state.conversations.len();
            state.conversations.retain(|conversation| conversation.id != id);
            if state.current_id.as_deref() == Some(id) {
                state.current_id = state
                    .conversations
                    .first()
                    .map(|conversation| conversation.id.clone());
                return true;
            }
            before != state.conversations.len()
        });
    }

    /// Remove all messages from the current conversation.
    pub fn clear_messages(&self) {
        self.state.update_if(|state| {
            let Some(id) = state.current_id.clone() else {
                return false;
            };
            match state.conversation_mut(&id) {
                Some(conversation) => {
                    conversation.messages.clear();
                    conversation.updated_at = chrono::Utc::now();
                    true
                }
                None => false,
            }
        });
    }

    /// Mark a conversation archived. Returns false for unknown ids.
    pub fn archive_conversation(&self, id: &str) -> bool {
        self.state.update_if(|state| match state.conversation_mut(id) {
            Some(conversation) => {
                conversation.status = ConversationStatus::Archived;
                conversation.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        })
    }

    fn begin_send(&self) -> Option<FlightGuard<'_>> {
        let mut slot = self.in_flight.lock();
        if let Some(previous) = slot.as_ref() {
            if !previous.token.is_cancelled() {
                return None;
            }
            debug!(
                "replacing cancelled send (generation={})",
                previous.generation
            );
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *slot = Some(InFlight {
            generation,
            token: token.clone(),
        });
        Some(FlightGuard {
            slot: &self.in_flight,
            generation,
            token,
        })
    }

    fn append(&self, conversation_id: &str, message: Message) {
        self.state.update_if(|state| match state.conversation_mut(conversation_id) {
            Some(conversation) => {
                conversation.push(message);
                true
            }
            None => {
                debug!(
                    "dropping message for deleted conversation (id={})",
                    conversation_id
                );
                false
            }
        });
    }
}

impl Drop for ChatStore {
    fn drop(&mut self) {
        if let Some(flight) = self.in_flight.get_mut().as_ref() {
            flight.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatStore, SEND_FAILED_TEXT};
    use crate::events::EventBus;
    use alphamind_rs_config::ChatConfig;
    use alphamind_rs_protocol::{ConversationStatus, Role};
    use alphamind_rs_test_utils::FailingTransport;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn store() -> ChatStore {
        ChatStore::new(
            Arc::new(FailingTransport::new()),
            "/api/chat",
            &ChatConfig::default(),
            EventBus::default(),
        )
    }

    #[test]
    fn new_store_starts_with_one_empty_conversation() {
        let store = store();
        let conversations = store.conversations();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "New Conversation");
        assert_eq!(
            store.current_conversation().expect("current").id,
            conversations[0].id
        );
        assert!(store.messages().is_empty());
    }

    #[test]
    fn default_titles_count_existing_conversations() {
        let store = store();
        let id = store.create_conversation(None);
        let current = store.current_conversation().expect("current");
        assert_eq!(current.id, id);
        assert_eq!(current.title, "Conversation 2");
    }

    #[test]
    fn deleting_current_selects_first_remaining() {
        let store = store();
        let first = store.current_conversation().expect("first").id;
        let second = store.create_conversation(Some("second"));
        store.delete_conversation(&second);
        assert_eq!(store.current_conversation().expect("current").id, first);
        store.delete_conversation(&first);
        assert!(store.current_conversation().is_none());
        assert!(store.state().current_id.is_none());
    }

    #[test]
    fn switching_to_unknown_id_selects_nothing() {
        let store = store();
        store.switch_conversation("nope");
        assert!(store.current_conversation().is_none());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn archive_marks_known_conversations_only() {
        let store = store();
        let id = store.current_conversation().expect("current").id;
        assert!(store.archive_conversation(&id));
        assert!(!store.archive_conversation("nope"));
        assert_eq!(
            store.current_conversation().expect("current").status,
            ConversationStatus::Archived
        );
    }

    #[tokio::test]
    async fn failed_send_appends_error_message_and_returns_error() {
        let store = store();
        let err = store.send_message("  hello  ").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].content, SEND_FAILED_TEXT);
        assert!(messages[1].is_error());
        assert!(!store.is_sending());
        assert!(!store.status().is_loading);
    }

    #[tokio::test]
    async fn blank_send_and_send_without_selection_are_noops() {
        let store = store();
        store.send_message("   ").await.expect("blank");
        store.switch_conversation("nope");
        store.send_message("hi").await.expect("no selection");
        store.switch_conversation(&store.conversations()[0].id);
        assert!(store.messages().is_empty());
        assert!(!store.cancel());
    }
}

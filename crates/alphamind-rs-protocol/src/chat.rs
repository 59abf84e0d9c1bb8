//! Conversations, messages and the chat request envelope.

use crate::{Metadata, new_record_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-generated message.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role from a lowercase string.
    pub fn parse(value: &str) -> Self {
        if value == "system" {
            Role::System
        } else if value == "assistant" {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(value))
    }
}

/// A single entry in a conversation. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message identifier.
    pub id: String,
    /// Role that produced the message.
    #[serde(rename = "sender", alias = "role")]
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Timestamp for the message.
    pub timestamp: DateTime<Utc>,
    /// Optional metadata, e.g. `{"error": true}` on synthetic failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// Build a message with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message flagged as a failed reply.
    pub fn assistant_error(content: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("error".to_string(), serde_json::Value::Bool(true));
        Self {
            metadata: Some(metadata),
            ..Self::assistant(content)
        }
    }

    /// Attach metadata to the message.
    pub fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the message carries the error flag.
    pub fn is_error(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("error"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Lifecycle status of a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Active,
    Archived,
}

/// An ordered thread of messages exchanged with one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Ordered, append-only message list.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Agent the conversation is held with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty, active conversation.
    pub fn new(title: impl Into<String>, agent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_record_id(),
            title: title.into(),
            messages: Vec::new(),
            agent_id,
            status: ConversationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Return the trailing `window` messages.
    pub fn history(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }

    /// Most recent user-authored message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
    }
}

/// Body posted to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Context window of earlier messages.
    #[serde(default)]
    pub history: Vec<Message>,
}

/// Reply returned by the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[cfg(test)]
mod tests {
    use super::{Conversation, Message, Role};
    use pretty_assertions::assert_eq;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(Role::parse("system"), Role::System);
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn message_uses_sender_on_the_wire() {
        let message = Message::user("hi");
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["sender"], "user");

        let parsed: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "role": "assistant",
            "content": "hello",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .expect("alias");
        assert_eq!(parsed.role, Role::Assistant);
    }

    #[test]
    fn history_returns_trailing_window() {
        let mut conversation = Conversation::new("t", None);
        for idx in 0..15 {
            conversation.push(Message::user(format!("m{idx}")));
        }
        let history = conversation.history(10);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "m5");
        assert_eq!(conversation.history(100).len(), 15);
    }

    #[test]
    fn error_flag_is_detected() {
        assert!(Message::assistant_error("oops").is_error());
        assert!(!Message::assistant("fine").is_error());
    }
}

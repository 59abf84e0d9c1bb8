//! Wire and domain types shared by the AlphaMind stores.
//!
//! Field names serialize in camelCase to match the dashboard backend.

mod agent;
mod chat;
mod data;
mod transport;

pub use agent::{Agent, AgentMetrics, AgentPatch, AgentStatus, AgentTemplate};
pub use chat::{ChatReply, ChatRequest, Conversation, ConversationStatus, Message, Role};
pub use data::{
    DataFile, Dataset, DatasetPatch, DatasetStatus, FileStatus, KnowledgeBase,
    KnowledgeBasePatch, KnowledgeBaseStatus, SearchResult, UploadFile,
};
pub use transport::{
    ApiRequest, ApiResponse, Method, MultipartForm, RequestBody, Transport, TransportError,
};

/// Free-form JSON metadata attached to messages, files and search hits.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Generate a fresh identifier for a locally created record.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//! Client-side state stores for the AlphaMind dashboard.
//!
//! Every store mirrors a slice of backend state and applies each operation
//! remotely first. When the backend cannot be reached the store records the
//! failure and applies the operation to its local copy instead, so callers
//! always observe a coherent snapshot.

pub mod agents;
pub mod chat;
pub mod data;
pub mod error;
pub mod events;
pub mod remote;
pub mod samples;
pub mod settings;
pub mod state;
pub mod tasks;
pub mod transport;
pub mod workspace;

pub use agents::AgentStore;
pub use chat::{ChatState, ChatStore};
pub use data::{DataStore, UploadFailure};
pub use error::StoreError;
pub use events::{EventBus, StoreEvent, StoreKind};
pub use remote::{Record, RemoteBackedCollection};
pub use settings::SettingsStore;
pub use state::{StateCell, StoreStatus};
pub use tasks::TaskScope;
pub use transport::{Endpoint, HttpTransport};
pub use workspace::{DashboardSummary, Workspace};

//! Test helpers shared across AlphaMind crates.

pub mod backend;
pub mod transport;

pub use backend::InMemoryBackend;
pub use transport::{FailingTransport, StubTransport};

//! Error types for store operations.

use crate::data::UploadFailure;
use alphamind_rs_protocol::{DataFile, TransportError};
use thiserror::Error;

/// Errors returned by store operations.
///
/// Transport failures normally trigger a local fallback and are only
/// surfaced when no fallback exists.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend call failed and no local fallback applied.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The referenced record is unknown to the store.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Imported settings were not valid JSON.
    #[error("invalid JSON format: {0}")]
    Parse(String),
    /// Some files in an upload batch were rejected by the backend.
    #[error("{} of {attempted} uploads failed", .failed.len())]
    PartialUpload {
        attempted: usize,
        failed: Vec<UploadFailure>,
        /// Records for every file in the batch, failed ones included.
        files: Vec<DataFile>,
    },
    /// A patch did not fit the shape of the record it targets.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

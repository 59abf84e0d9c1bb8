//! Files, datasets, knowledge bases and search hits.

use crate::{Metadata, new_record_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing lifecycle of an uploaded file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl FileStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploading => "uploading",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FileStatus::Uploading => 0,
            FileStatus::Processing => 1,
            FileStatus::Completed | FileStatus::Error => 2,
        }
    }

    /// Whether the file can move from `self` to `next`.
    ///
    /// Status only moves forward: uploading -> processing -> completed|error.
    /// Uploading may jump straight to error.
    pub fn can_advance_to(&self, next: FileStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }
}

/// An uploaded file tracked by the data store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    /// File identifier.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    pub status: FileStatus,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Download location assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DataFile {
    /// Register a new record for a file that is about to be uploaded.
    pub fn uploading(file: &UploadFile) -> Self {
        Self {
            id: new_record_id(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
            status: FileStatus::Uploading,
            uploaded_at: Utc::now(),
            processed_at: None,
            metadata: None,
            url: None,
        }
    }

    /// Move to `next` if the transition is forward. Returns whether it moved.
    pub fn advance(&mut self, next: FileStatus) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        if next == FileStatus::Completed {
            self.processed_at = Some(Utc::now());
        }
        true
    }
}

/// Raw file content handed to an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Status of a dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    #[default]
    Active,
    Processing,
    Error,
}

/// A named group of uploaded files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ids of member files.
    #[serde(default)]
    pub files: Vec<String>,
    /// Sum of member file sizes in bytes.
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub status: DatasetStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Dataset {
    /// Create an empty, active dataset.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_record_id(),
            name: name.into(),
            description: description.into(),
            files: Vec::new(),
            total_size: 0,
            status: DatasetStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial dataset update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DatasetStatus>,
}

impl DatasetPatch {
    /// Apply the set fields and bump `updated_at`.
    pub fn apply_to(&self, dataset: &mut Dataset) {
        if let Some(name) = &self.name {
            dataset.name = name.clone();
        }
        if let Some(description) = &self.description {
            dataset.description = description.clone();
        }
        if let Some(files) = &self.files {
            dataset.files = files.clone();
        }
        if let Some(total_size) = self.total_size {
            dataset.total_size = total_size;
        }
        if let Some(status) = self.status {
            dataset.status = status;
        }
        dataset.updated_at = Utc::now();
    }
}

/// Indexing status of a knowledge base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBaseStatus {
    Indexing,
    Ready,
    Error,
}

/// An indexed, searchable aggregation of datasets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ids of source datasets.
    #[serde(default)]
    pub datasets: Vec<String>,
    #[serde(default)]
    pub vector_count: u64,
    pub status: KnowledgeBaseStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Create a knowledge base that has not been indexed yet.
    pub fn indexing(
        name: impl Into<String>,
        description: impl Into<String>,
        datasets: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_record_id(),
            name: name.into(),
            description: description.into(),
            datasets,
            vector_count: 0,
            status: KnowledgeBaseStatus::Indexing,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial knowledge base update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBasePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<KnowledgeBaseStatus>,
}

impl KnowledgeBasePatch {
    /// Apply the set fields and bump `updated_at`.
    pub fn apply_to(&self, knowledge_base: &mut KnowledgeBase) {
        if let Some(name) = &self.name {
            knowledge_base.name = name.clone();
        }
        if let Some(description) = &self.description {
            knowledge_base.description = description.clone();
        }
        if let Some(datasets) = &self.datasets {
            knowledge_base.datasets = datasets.clone();
        }
        if let Some(vector_count) = self.vector_count {
            knowledge_base.vector_count = vector_count;
        }
        if let Some(status) = self.status {
            knowledge_base.status = status;
        }
        knowledge_base.updated_at = Utc::now();
    }
}

/// A single knowledge search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::{DataFile, Dataset, DatasetStatus, FileStatus, UploadFile};
    use pretty_assertions::assert_eq;

    #[test]
    fn file_status_only_moves_forward() {
        assert!(FileStatus::Uploading.can_advance_to(FileStatus::Processing));
        assert!(FileStatus::Uploading.can_advance_to(FileStatus::Error));
        assert!(FileStatus::Processing.can_advance_to(FileStatus::Completed));
        assert!(!FileStatus::Processing.can_advance_to(FileStatus::Uploading));
        assert!(!FileStatus::Completed.can_advance_to(FileStatus::Error));
        assert!(!FileStatus::Error.can_advance_to(FileStatus::Completed));
    }

    #[test]
    fn advance_sets_processed_timestamp() {
        let upload = UploadFile::new("a.csv", "text/csv", b"a,b\n1,2\n".to_vec());
        let mut file = DataFile::uploading(&upload);
        assert_eq!(file.size, 8);
        assert!(file.advance(FileStatus::Processing));
        assert!(file.processed_at.is_none());
        assert!(file.advance(FileStatus::Completed));
        assert!(file.processed_at.is_some());
        assert!(!file.advance(FileStatus::Processing));
        assert_eq!(file.status, FileStatus::Completed);
    }

    #[test]
    fn data_file_uses_type_on_the_wire() {
        let upload = UploadFile::new("doc.pdf", "application/pdf", Vec::new());
        let value = serde_json::to_value(DataFile::uploading(&upload)).expect("serialize");
        assert_eq!(value["type"], "application/pdf");
        assert_eq!(value["status"], "uploading");
    }

    #[test]
    fn dataset_without_timestamps_decodes() {
        let dataset: Dataset =
            serde_json::from_value(serde_json::json!({ "id": "d1", "name": "Logs" }))
                .expect("decode");
        assert_eq!(dataset.id, "d1");
        assert_eq!(dataset.status, DatasetStatus::Active);
        assert!(dataset.files.is_empty());
    }
}

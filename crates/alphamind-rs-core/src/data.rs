//! Data store: file uploads, datasets, knowledge bases and search.

use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent, StoreKind};
use crate::remote::{RemoteBackedCollection, merge_remote};
use crate::samples;
use crate::state::{StatusTracker, StoreStatus};
use crate::tasks::TaskScope;
use crate::transport::Endpoint;
use alphamind_rs_config::{DataConfig, DatasetDeletePolicy, UploadFailurePolicy};
use alphamind_rs_protocol::{
    DataFile, Dataset, DatasetPatch, FileStatus, KnowledgeBase, KnowledgeBasePatch,
    KnowledgeBaseStatus, MultipartForm, SearchResult, Transport, UploadFile,
};
use chrono::Utc;
use futures_util::future::join_all;
use log::{debug, info};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::watch;

/// Upper bound (exclusive) for simulated vector counts.
const SIMULATED_MAX_VECTORS: u64 = 2000;

/// A file the backend refused during a batch upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub file_id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DataFile>,
}

#[derive(Deserialize)]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseList {
    #[serde(default)]
    knowledge_bases: Vec<KnowledgeBase>,
}

#[derive(Deserialize)]
struct SearchReply {
    #[serde(default)]
    results: Vec<SearchResult>,
}

pub struct DataStore {
    root: Endpoint,
    files: RemoteBackedCollection<DataFile>,
    datasets: RemoteBackedCollection<Dataset>,
    knowledge_bases: RemoteBackedCollection<KnowledgeBase>,
    config: DataConfig,
    status: StatusTracker,
    events: EventBus,
    tasks: TaskScope,
}

impl DataStore {
    /// Create a store rooted at `base_path` (normally `/api/data`).
    pub fn new(
        transport: Arc<dyn Transport>,
        base_path: &str,
        config: &DataConfig,
        events: EventBus,
    ) -> Self {
        let root = Endpoint::new(transport, base_path);
        Self {
            files: RemoteBackedCollection::new(root.child("/files")),
            datasets: RemoteBackedCollection::new(root.child("/datasets")),
            knowledge_bases: RemoteBackedCollection::new(root.child("/knowledge-bases")),
            root,
            config: config.clone(),
            status: StatusTracker::new(StoreKind::Data, events.clone()),
            events,
            tasks: TaskScope::new(),
        }
    }

    pub fn files(&self) -> Vec<DataFile> {
        self.files.items()
    }

    pub fn file(&self, id: &str) -> Option<DataFile> {
        self.files.get(id)
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.datasets.items()
    }

    pub fn dataset(&self, id: &str) -> Option<Dataset> {
        self.datasets.get(id)
    }

    pub fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.knowledge_bases.items()
    }

    pub fn knowledge_base(&self, id: &str) -> Option<KnowledgeBase> {
        self.knowledge_bases.get(id)
    }

    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    pub fn subscribe_files(&self) -> watch::Receiver<Vec<DataFile>> {
        self.files.subscribe()
    }

    pub fn subscribe_datasets(&self) -> watch::Receiver<Vec<Dataset>> {
        self.datasets.subscribe()
    }

    pub fn subscribe_knowledge_bases(&self) -> watch::Receiver<Vec<KnowledgeBase>> {
        self.knowledge_bases.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    /// Simulated transitions that have not fired yet.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }

    /// Cancel every pending simulated transition.
    pub fn shutdown(&self) {
        self.tasks.shutdown();
    }

    /// Reload files, datasets and knowledge bases concurrently.
    ///
    /// Each collection falls back to its samples independently.
    pub async fn refresh_data(&self) {
        let _loading = self.status.begin();
        let (files, datasets, knowledge_bases) = tokio::join!(
            self.files
                .endpoint()
                .fetch::<FileList>(self.files.endpoint().get("")),
            self.datasets
                .endpoint()
                .fetch::<DatasetList>(self.datasets.endpoint().get("")),
            self.knowledge_bases
                .endpoint()
                .fetch::<KnowledgeBaseList>(self.knowledge_bases.endpoint().get("")),
        );
        match files {
            Ok(list) => self.files.set_all(list.files),
            Err(err) => {
                self.status.record("refresh_files", &err);
                self.files.set_all(samples::sample_files());
            }
        }
        match datasets {
            Ok(list) => self.datasets.set_all(list.datasets),
            Err(err) => {
                self.status.record("refresh_datasets", &err);
                self.datasets.set_all(samples::sample_datasets());
            }
        }
        match knowledge_bases {
            Ok(list) => self.knowledge_bases.set_all(list.knowledge_bases),
            Err(err) => {
                self.status.record("refresh_knowledge_bases", &err);
                self.knowledge_bases
                    .set_all(samples::sample_knowledge_bases());
            }
        }
        info!(
            "data refreshed (files={}, datasets={}, knowledge_bases={})",
            self.files.len(),
            self.datasets.len(),
            self.knowledge_bases.len()
        );
    }

    /// Upload files one at a time, in order.
    ///
    /// Every file is registered as `uploading`, moved to `processing` once
    /// accepted and to `completed` after the configured processing delay.
    /// When `dataset_id` names a known dataset, accepted files are attached to
    /// it. Rejections follow the configured [`UploadFailurePolicy`]; under
    /// `MarkError` the batch still runs to the end and then returns
    /// [`StoreError::PartialUpload`].
    pub async fn upload_files(
        &self,
        files: Vec<UploadFile>,
        dataset_id: Option<&str>,
    ) -> Result<Vec<DataFile>, StoreError> {
        let _loading = self.status.begin();
        let attempted = files.len();
        let target = dataset_id.filter(|id| self.datasets.contains(id));
        let mut uploaded = Vec::with_capacity(attempted);
        let mut failed = Vec::new();

        for file in files {
            let record = DataFile::uploading(&file);
            let file_id = record.id.clone();
            self.files.push(record.clone());

            let mut form = MultipartForm::new(file);
            if let Some(dataset_id) = dataset_id {
                form = form.with_field("datasetId", dataset_id);
            }
            let request = self.files.endpoint().post("/upload").with_multipart(form);
            match self.files.endpoint().send(request).await {
                Ok(response) => self.mark_processing(&file_id, Some(response)),
                Err(err) => {
                    self.status.record("upload_files", &err);
                    match self.config.upload_failure_policy {
                        UploadFailurePolicy::Simulate => self.mark_processing(&file_id, None),
                        UploadFailurePolicy::MarkError => {
                            advance_file(&self.files, &self.events, &file_id, FileStatus::Error);
                            failed.push(UploadFailure {
                                file_id: file_id.clone(),
                                name: record.name.clone(),
                                reason: err.to_string(),
                            });
                        }
                    }
                }
            }

            let current = self.files.get(&file_id).unwrap_or(record);
            if current.status == FileStatus::Processing {
                self.schedule_completion(&file_id);
                if let Some(dataset_id) = target {
                    self.attach_to_dataset(dataset_id, &current);
                }
            }
            uploaded.push(current);
        }

        info!(
            "upload batch finished (files={}, failed={})",
            attempted,
            failed.len()
        );
        if failed.is_empty() {
            Ok(uploaded)
        } else {
            Err(StoreError::PartialUpload {
                attempted,
                failed,
                files: uploaded,
            })
        }
    }

    /// Delete a file and drop it from every dataset that references it.
    pub async fn delete_file(&self, id: &str) {
        self.status.clear_error();
        self.remove_file(id).await;
    }

    pub async fn create_dataset(&self, name: &str, description: Option<&str>) -> Dataset {
        let _loading = self.status.begin();
        let description = description.unwrap_or_default();
        let local = Dataset::new(name, description);
        let endpoint = self.datasets.endpoint();
        let request = endpoint
            .post("")
            .with_json(json!({ "name": name, "description": description }));
        let dataset = match endpoint
            .send(request)
            .await
            .and_then(|value| merge_remote::<Dataset>(Some(&local), value))
        {
            Ok(dataset) => dataset,
            Err(err) => {
                self.status.record("create_dataset", &err);
                local
            }
        };
        info!("dataset created (id={}, name={})", dataset.id, dataset.name);
        self.datasets.push(dataset.clone());
        dataset
    }

    /// Update a dataset, returning the merged record.
    pub async fn update_dataset(
        &self,
        id: &str,
        updates: DatasetPatch,
    ) -> Result<Dataset, StoreError> {
        self.status.clear_error();
        let body = serde_json::to_value(&updates)?;
        let local = self.datasets.get(id);
        let endpoint = self.datasets.endpoint();
        let remote = endpoint
            .send(endpoint.put(&format!("/{id}")).with_json(body))
            .await
            .and_then(|value| merge_remote::<Dataset>(local.as_ref(), value));
        match remote {
            Ok(mut dataset) => {
                dataset.id = id.to_string();
                dataset.updated_at = Utc::now();
                self.datasets.replace(dataset.clone());
                Ok(dataset)
            }
            Err(err) => {
                self.status.record("update_dataset", &err);
                self.datasets
                    .modify(id, |dataset| updates.apply_to(dataset))
                    .ok_or_else(|| StoreError::not_found("dataset", id))
            }
        }
    }

    /// Delete a dataset. Member files are deleted too under
    /// [`DatasetDeletePolicy::CascadeFiles`].
    pub async fn delete_dataset(&self, id: &str) {
        self.status.clear_error();
        let member_files = self
            .datasets
            .get(id)
            .map(|dataset| dataset.files)
            .unwrap_or_default();
        let endpoint = self.datasets.endpoint();
        if let Err(err) = endpoint.send(endpoint.delete(&format!("/{id}"))).await {
            self.status.record("delete_dataset", &err);
        }
        self.datasets.remove(id);

        if self.config.dataset_delete_policy == DatasetDeletePolicy::CascadeFiles
            && !member_files.is_empty()
        {
            info!(
                "deleting dataset files (dataset={}, files={})",
                id,
                member_files.len()
            );
            join_all(member_files.iter().map(|file_id| self.remove_file(file_id))).await;
        }
    }

    /// Create a knowledge base. The local fallback starts `indexing` and
    /// becomes `ready` after the configured indexing delay.
    pub async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
        dataset_ids: Vec<String>,
    ) -> KnowledgeBase {
        let _loading = self.status.begin();
        let endpoint = self.knowledge_bases.endpoint();
        let request = endpoint.post("").with_json(json!({
            "name": name,
            "description": description,
            "datasetIds": dataset_ids,
        }));
        let local = KnowledgeBase::indexing(name, description, dataset_ids);
        match endpoint
            .send(request)
            .await
            .and_then(|value| merge_remote::<KnowledgeBase>(Some(&local), value))
        {
            Ok(knowledge_base) => {
                info!(
                    "knowledge base created (id={}, status={:?})",
                    knowledge_base.id, knowledge_base.status
                );
                self.knowledge_bases.push(knowledge_base.clone());
                knowledge_base
            }
            Err(err) => {
                self.status.record("create_knowledge_base", &err);
                self.knowledge_bases.push(local.clone());
                self.schedule_indexing(&local.id);
                local
            }
        }
    }

    /// Update a knowledge base, returning the merged record.
    pub async fn update_knowledge_base(
        &self,
        id: &str,
        updates: KnowledgeBasePatch,
    ) -> Result<KnowledgeBase, StoreError> {
        self.status.clear_error();
        let body = serde_json::to_value(&updates)?;
        let local = self.knowledge_bases.get(id);
        let endpoint = self.knowledge_bases.endpoint();
        let remote = endpoint
            .send(endpoint.put(&format!("/{id}")).with_json(body))
            .await
            .and_then(|value| merge_remote::<KnowledgeBase>(local.as_ref(), value));
        match remote {
            Ok(mut knowledge_base) => {
                knowledge_base.id = id.to_string();
                knowledge_base.updated_at = Utc::now();
                self.knowledge_bases.replace(knowledge_base.clone());
                Ok(knowledge_base)
            }
            Err(err) => {
                self.status.record("update_knowledge_base", &err);
                self.knowledge_bases
                    .modify(id, |knowledge_base| updates.apply_to(knowledge_base))
                    .ok_or_else(|| StoreError::not_found("knowledge base", id))
            }
        }
    }

    pub async fn delete_knowledge_base(&self, id: &str) {
        self.status.clear_error();
        let endpoint = self.knowledge_bases.endpoint();
        if let Err(err) = endpoint.send(endpoint.delete(&format!("/{id}"))).await {
            self.status.record("delete_knowledge_base", &err);
        }
        self.knowledge_bases.remove(id);
    }

    /// Search indexed content, optionally within one knowledge base.
    pub async fn search_knowledge(
        &self,
        query: &str,
        knowledge_base_id: Option<&str>,
    ) -> Vec<SearchResult> {
        self.status.clear_error();
        let mut request = self.root.get("/search").with_query("query", query);
        if let Some(knowledge_base_id) = knowledge_base_id {
            request = request.with_query("knowledgeBaseId", knowledge_base_id);
        }
        match self.root.fetch::<SearchReply>(request).await {
            Ok(reply) => reply.results,
            Err(err) => {
                self.status.record("search_knowledge", &err);
                samples::sample_search_results(query)
            }
        }
    }

    async fn remove_file(&self, id: &str) {
        let endpoint = self.files.endpoint();
        if let Err(err) = endpoint.send(endpoint.delete(&format!("/{id}"))).await {
            self.status.record("delete_file", &err);
        }
        let size = self.files.remove(id).map(|file| file.size).unwrap_or(0);
        self.datasets.modify_all(|dataset| {
            let Some(index) = dataset.files.iter().position(|file_id| file_id == id) else {
                return false;
            };
            dataset.files.remove(index);
            dataset.total_size = dataset.total_size.saturating_sub(size);
            dataset.updated_at = Utc::now();
            true
        });
        debug!("file removed (id={})", id);
    }

    fn mark_processing(&self, file_id: &str, response: Option<Value>) {
        self.files.modify(file_id, |file| {
            if let Some(response @ Value::Object(_)) = response
                && let Ok(mut remote) = merge_remote::<DataFile>(Some(&*file), response)
            {
                remote.id = file.id.clone();
                remote.status = file.status;
                remote.processed_at = file.processed_at;
                *file = remote;
            }
        });
        advance_file(&self.files, &self.events, file_id, FileStatus::Processing);
    }

    fn schedule_completion(&self, file_id: &str) {
        let files = self.files.clone();
        let events = self.events.clone();
        let file_id = file_id.to_string();
        self.tasks
            .schedule(self.config.processing_delay(), move || {
                advance_file(&files, &events, &file_id, FileStatus::Completed);
            });
    }

    fn schedule_indexing(&self, knowledge_base_id: &str) {
        let knowledge_bases = self.knowledge_bases.clone();
        let knowledge_base_id = knowledge_base_id.to_string();
        self.tasks
            .schedule(self.config.indexing_delay(), move || {
                let vector_count = rand::rng().random_range(0..SIMULATED_MAX_VECTORS);
                knowledge_bases.modify(&knowledge_base_id, |knowledge_base| {
                    if knowledge_base.status == KnowledgeBaseStatus::Indexing {
                        knowledge_base.status = KnowledgeBaseStatus::Ready;
                        knowledge_base.vector_count = vector_count;
                        knowledge_base.updated_at = Utc::now();
                    }
                });
                debug!(
                    "knowledge base indexed (id={}, vectors={})",
                    knowledge_base_id, vector_count
                );
            });
    }

    fn attach_to_dataset(&self, dataset_id: &str, file: &DataFile) {
        self.datasets.modify(dataset_id, |dataset| {
            if !dataset.files.contains(&file.id) {
                dataset.files.push(file.id.clone());
                dataset.total_size += file.size;
                dataset.updated_at = Utc::now();
            }
        });
    }
}

/// Move a file forward in its lifecycle and announce the change.
fn advance_file(
    files: &RemoteBackedCollection<DataFile>,
    events: &EventBus,
    file_id: &str,
    next: FileStatus,
) {
    let mut moved = false;
    files.modify(file_id, |file| moved = file.advance(next));
    if moved {
        debug!(
            "file status changed (id={}, status={})",
            file_id,
            next.as_str()
        );
        events.emit(StoreEvent::FileStatusChanged {
            file_id: file_id.to_string(),
            status: next,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::DataStore;
    use crate::events::EventBus;
    use alphamind_rs_config::DataConfig;
    use alphamind_rs_protocol::{DatasetPatch, KnowledgeBaseStatus};
    use alphamind_rs_test_utils::FailingTransport;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn offline_store() -> DataStore {
        DataStore::new(
            Arc::new(FailingTransport::new()),
            "/api/data",
            &DataConfig::default(),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn refresh_falls_back_to_samples_per_collection() {
        let store = offline_store();
        store.refresh_data().await;
        assert_eq!(store.files().len(), 2);
        assert_eq!(store.datasets().len(), 1);
        assert_eq!(store.knowledge_bases().len(), 1);
        assert!(!store.status().is_loading);
    }

    #[tokio::test]
    async fn update_of_unknown_dataset_is_not_found_offline() {
        let store = offline_store();
        let err = store
            .update_dataset("nope", DatasetPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "dataset not found: nope");
    }

    #[tokio::test(start_paused = true)]
    async fn local_knowledge_base_becomes_ready_after_delay() {
        let store = offline_store();
        let created = store
            .create_knowledge_base("kb", "docs", vec!["1".to_string()])
            .await;
        assert_eq!(created.status, KnowledgeBaseStatus::Indexing);
        assert_eq!(created.vector_count, 0);

        tokio::time::sleep(Duration::from_millis(3001)).await;
        let ready = store.knowledge_base(&created.id).expect("kb");
        assert_eq!(ready.status, KnowledgeBaseStatus::Ready);
        assert!(ready.vector_count < 2000);
    }

    #[tokio::test]
    async fn search_fallback_echoes_query() {
        let store = offline_store();
        let results = store.search_knowledge("pricing", None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "Mock search result for \"pricing\"");
        assert_eq!(results[0].score, 0.95);
    }
}

//! Configuration schema for AlphaMind clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root config for an AlphaMind client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub settings: SettingsStoreConfig,
}

impl ClientConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for assembling a `ClientConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Override the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    /// Replace the API configuration.
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.config.api = api;
        self
    }

    /// Replace the chat configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the data store configuration.
    pub fn data(mut self, data: DataConfig) -> Self {
        self.config.data = data;
        self
    }

    /// Replace the settings store configuration.
    pub fn settings(mut self, settings: SettingsStoreConfig) -> Self {
        self.config.settings = settings;
        self
    }

    /// Finalize and return the built `ClientConfig`.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Backend location and per-store route prefixes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_agents_path")]
    pub agents_path: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Optional per-request timeout for the HTTP transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            agents_path: default_agents_path(),
            chat_path: default_chat_path(),
            data_path: default_data_path(),
            settings_path: default_settings_path(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_agents_path() -> String {
    "/api/agents".to_string()
}

fn default_chat_path() -> String {
    "/api/chat".to_string()
}

fn default_data_path() -> String {
    "/api/data".to_string()
}

fn default_settings_path() -> String {
    "/api/settings".to_string()
}

/// Chat store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Agent attached to new conversations.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Number of earlier messages sent as reply context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Title of the conversation created when the store starts empty.
    #[serde(default = "default_initial_title")]
    pub initial_title: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            history_window: default_history_window(),
            initial_title: default_initial_title(),
        }
    }
}

fn default_history_window() -> usize {
    10
}

fn default_initial_title() -> String {
    "New Conversation".to_string()
}

/// What an upload does when the backend rejects a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadFailurePolicy {
    /// Keep the record and simulate processing locally.
    #[default]
    Simulate,
    /// Mark the file as errored, continue the batch, report failures.
    MarkError,
}

/// Whether deleting a dataset also deletes its files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatasetDeletePolicy {
    #[default]
    KeepFiles,
    CascadeFiles,
}

/// Data store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Delay before an uploaded file is reported as processed.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
    /// Delay before a locally created knowledge base is reported as indexed.
    #[serde(default = "default_indexing_delay_ms")]
    pub indexing_delay_ms: u64,
    #[serde(default)]
    pub upload_failure_policy: UploadFailurePolicy,
    #[serde(default)]
    pub dataset_delete_policy: DatasetDeletePolicy,
}

impl DataConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn indexing_delay(&self) -> Duration {
        Duration::from_millis(self.indexing_delay_ms)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay_ms(),
            indexing_delay_ms: default_indexing_delay_ms(),
            upload_failure_policy: UploadFailurePolicy::default(),
            dataset_delete_policy: DatasetDeletePolicy::default(),
        }
    }
}

fn default_processing_delay_ms() -> u64 {
    2000
}

fn default_indexing_delay_ms() -> u64 {
    3000
}

/// Settings store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsStoreConfig {
    /// Probability that an integration test succeeds when the backend is unreachable.
    #[serde(default = "default_integration_success_rate")]
    pub integration_fallback_success_rate: f64,
}

impl Default for SettingsStoreConfig {
    fn default() -> Self {
        Self {
            integration_fallback_success_rate: default_integration_success_rate(),
        }
    }
}

fn default_integration_success_rate() -> f64 {
    0.7
}

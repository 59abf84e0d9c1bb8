//! One instance of every store sharing a transport and an event bus.

use crate::agents::AgentStore;
use crate::chat::ChatStore;
use crate::data::DataStore;
use crate::events::{DEFAULT_EVENT_BUFFER, EventBus};
use crate::settings::SettingsStore;
use alphamind_rs_config::ClientConfig;
use alphamind_rs_protocol::{AgentStatus, KnowledgeBaseStatus, Role, Transport};
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::sync::Arc;

/// Headline numbers for the dashboard overview.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub active_agents: usize,
    pub total_agents: usize,
    pub conversations: usize,
    pub messages_today: usize,
    /// Mean of the agents' reported response times, in seconds.
    pub average_response_time: Option<f64>,
    pub files: usize,
    pub ready_knowledge_bases: usize,
}

pub struct Workspace {
    pub agents: AgentStore,
    pub chat: ChatStore,
    pub data: DataStore,
    pub settings: SettingsStore,
    events: EventBus,
}

impl Workspace {
    /// Build the stores without loading anything.
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let events = EventBus::new(DEFAULT_EVENT_BUFFER);
        let api = &config.api;
        Self {
            agents: AgentStore::new(transport.clone(), &api.agents_path, events.clone()),
            chat: ChatStore::new(
                transport.clone(),
                &api.chat_path,
                &config.chat,
                events.clone(),
            ),
            data: DataStore::new(
                transport.clone(),
                &api.data_path,
                &config.data,
                events.clone(),
            ),
            settings: SettingsStore::new(
                transport,
                &api.settings_path,
                &config.settings,
                events.clone(),
            ),
            events,
        }
    }

    /// Build the stores and run the initial loads concurrently.
    pub async fn connect(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let workspace = Self::new(config, transport);
        tokio::join!(
            workspace.agents.refresh_agents(),
            workspace.agents.load_templates(),
            workspace.data.refresh_data(),
            workspace.settings.refresh_settings(),
        );
        info!(
            "workspace connected (agents={}, files={})",
            workspace.agents.agents().len(),
            workspace.data.files().len()
        );
        workspace
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn summary(&self) -> DashboardSummary {
        let agents = self.agents.agents();
        let response_times: Vec<f64> = agents
            .iter()
            .filter_map(|agent| agent.metrics.as_ref())
            .map(|metrics| metrics.average_response_time)
            .collect();
        let average_response_time = (!response_times.is_empty())
            .then(|| response_times.iter().sum::<f64>() / response_times.len() as f64);

        let today = Utc::now().date_naive();
        let conversations = self.chat.conversations();
        let messages_today = conversations
            .iter()
            .flat_map(|conversation| conversation.messages.iter())
            .filter(|message| {
                message.role == Role::User && message.timestamp.date_naive() == today
            })
            .count();

        DashboardSummary {
            active_agents: agents
                .iter()
                .filter(|agent| agent.status == AgentStatus::Active)
                .count(),
            total_agents: agents.len(),
            conversations: conversations.len(),
            messages_today,
            average_response_time,
            files: self.data.files().len(),
            ready_knowledge_bases: self
                .data
                .knowledge_bases()
                .iter()
                .filter(|kb| kb.status == KnowledgeBaseStatus::Ready)
                .count(),
        }
    }

    /// Cancel in-flight chat sends and pending simulated transitions.
    pub fn shutdown(&self) {
        self.chat.cancel();
        self.data.shutdown();
    }
}

//! Agent store: agent CRUD, templates, test prompts and metrics.

use crate::error::StoreError;
use crate::events::{EventBus, StoreKind};
use crate::remote::{RemoteBackedCollection, merge_remote};
use crate::samples;
use crate::state::{StateCell, StatusTracker, StoreStatus};
use crate::transport::Endpoint;
use alphamind_rs_protocol::{
    Agent, AgentMetrics, AgentPatch, AgentStatus, AgentTemplate, Transport, new_record_id,
};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Deserialize)]
struct AgentList {
    #[serde(default)]
    agents: Vec<Agent>,
}

#[derive(Deserialize)]
struct TemplateList {
    #[serde(default)]
    templates: Vec<AgentTemplate>,
}

#[derive(Deserialize)]
struct TestReply {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct MetricsReply {
    metrics: AgentMetrics,
}

/// Local mirror of the agents collection.
pub struct AgentStore {
    agents: RemoteBackedCollection<Agent>,
    templates: StateCell<Vec<AgentTemplate>>,
    status: StatusTracker,
}

impl AgentStore {
    /// Create a store rooted at `base_path` (normally `/api/agents`).
    pub fn new(transport: Arc<dyn Transport>, base_path: &str, events: EventBus) -> Self {
        Self {
            agents: RemoteBackedCollection::new(Endpoint::new(transport, base_path)),
            templates: StateCell::new(Vec::new()),
            status: StatusTracker::new(StoreKind::Agents, events),
        }
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.agents.items()
    }

    pub fn agent(&self, id: &str) -> Option<Agent> {
        self.agents.get(id)
    }

    pub fn templates(&self) -> Vec<AgentTemplate> {
        self.templates.get()
    }

    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Agent>> {
        self.agents.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    fn endpoint(&self) -> &Endpoint {
        self.agents.endpoint()
    }

    /// Reload all agents; falls back to the built-in samples.
    pub async fn refresh_agents(&self) {
        let _loading = self.status.begin();
        match self.endpoint().fetch::<AgentList>(self.endpoint().get("")).await {
            Ok(list) => {
                info!("agents refreshed (count={})", list.agents.len());
                self.agents.set_all(list.agents);
            }
            Err(err) => {
                self.status.record("refresh_agents", &err);
                self.agents.set_all(samples::sample_agents());
            }
        }
    }

    /// Reload templates; falls back to the built-in templates.
    ///
    /// Failures here do not touch the error field.
    pub async fn load_templates(&self) {
        match self
            .endpoint()
            .fetch::<TemplateList>(self.endpoint().get("/templates"))
            .await
        {
            Ok(list) => {
                debug!("templates loaded (count={})", list.templates.len());
                self.templates.replace(list.templates);
            }
            Err(err) => {
                debug!("templates unavailable, using samples (error={})", err);
                self.templates.replace(samples::sample_templates());
            }
        }
    }

    /// Create an agent; falls back to a local inactive agent.
    ///
    /// The backend reply is overlaid on the locally built agent, so a reply
    /// carrying only the new id still counts as a success.
    pub async fn create_agent(&self, config: AgentPatch) -> Result<Agent, StoreError> {
        let _loading = self.status.begin();
        let body = serde_json::to_value(&config)?;
        let local = config.into_agent(new_record_id());
        let request = self.endpoint().post("").with_json(body);
        let agent = match self
            .endpoint()
            .send(request)
            .await
            .and_then(|value| merge_remote::<Agent>(Some(&local), value))
        {
            Ok(agent) => agent,
            Err(err) => {
                self.status.record("create_agent", &err);
                local
            }
        };
        info!("agent created (id={}, name={})", agent.id, agent.name);
        self.agents.push(agent.clone());
        Ok(agent)
    }

    /// Update an agent, returning the merged record.
    ///
    /// Returns `NotFound` only when the backend failed and the agent is not
    /// known locally.
    pub async fn update_agent(&self, id: &str, updates: AgentPatch) -> Result<Agent, StoreError> {
        let _loading = self.status.begin();
        let body = serde_json::to_value(&updates)?;
        let local = self.agents.get(id);
        let remote = self
            .endpoint()
            .send(self.endpoint().put(&format!("/{id}")).with_json(body))
            .await
            .and_then(|value| merge_remote::<Agent>(local.as_ref(), value));
        match remote {
            Ok(mut agent) => {
                agent.id = id.to_string();
                agent.updated_at = chrono::Utc::now();
                self.agents.replace(agent.clone());
                Ok(agent)
            }
            Err(err) => {
                self.status.record("update_agent", &err);
                self.agents
                    .modify(id, |agent| updates.apply_to(agent))
                    .ok_or_else(|| StoreError::not_found("agent", id))
            }
        }
    }

    /// Delete an agent. Idempotent; local state drops the agent either way.
    pub async fn delete_agent(&self, id: &str) {
        let _loading = self.status.begin();
        if let Err(err) = self
            .endpoint()
            .send(self.endpoint().delete(&format!("/{id}")))
            .await
        {
            self.status.record("delete_agent", &err);
        }
        if self.agents.remove(id).is_some() {
            info!("agent deleted (id={})", id);
        }
    }

    pub async fn activate_agent(&self, id: &str) -> Result<(), StoreError> {
        self.update_agent(id, AgentPatch::status(AgentStatus::Active))
            .await
            .map(|_| ())
    }

    pub async fn deactivate_agent(&self, id: &str) -> Result<(), StoreError> {
        self.update_agent(id, AgentPatch::status(AgentStatus::Inactive))
            .await
            .map(|_| ())
    }

    /// Send a test prompt to an agent and return its reply.
    pub async fn test_agent(&self, id: &str, message: &str) -> String {
        self.status.clear_error();
        let request = self
            .endpoint()
            .post(&format!("/{id}/test"))
            .with_json(json!({ "message": message }));
        match self.endpoint().fetch::<TestReply>(request).await {
            Ok(reply) => reply.response,
            Err(err) => {
                self.status.record("test_agent", &err);
                format!("Test response from agent {id}: I received your message \"{message}\"")
            }
        }
    }

    /// Fetch usage metrics and store them on the local agent.
    pub async fn get_agent_metrics(&self, id: &str) -> AgentMetrics {
        let metrics = match self
            .endpoint()
            .fetch::<MetricsReply>(self.endpoint().get(&format!("/{id}/metrics")))
            .await
        {
            Ok(reply) => reply.metrics,
            Err(err) => {
                self.status.record("get_agent_metrics", &err);
                samples::random_metrics()
            }
        };
        self.agents
            .modify(id, |agent| agent.metrics = Some(metrics.clone()));
        metrics
    }

    /// Create an agent from a loaded template. Caller fields win over the
    /// template config; the name defaults to the template name.
    pub async fn create_from_template(
        &self,
        template_id: &str,
        customizations: AgentPatch,
    ) -> Result<Agent, StoreError> {
        let template = self
            .templates
            .read(|templates| templates.iter().find(|t| t.id == template_id).cloned())
            .ok_or_else(|| StoreError::not_found("template", template_id))?;
        let name = customizations
            .name
            .clone()
            .unwrap_or_else(|| template.name.clone());
        let mut config = customizations.merged_over(template.config);
        config.name = Some(name);
        self.create_agent(config).await
    }
}

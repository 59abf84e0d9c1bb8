//! Agent definitions, templates and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default model for agents created without one.
pub const DEFAULT_AGENT_MODEL: &str = "gpt-3.5-turbo";
/// Default sampling temperature for new agents.
pub const DEFAULT_AGENT_TEMPERATURE: f64 = 0.7;
/// Default output token cap for new agents.
pub const DEFAULT_AGENT_MAX_TOKENS: u32 = 2000;

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent answers conversations.
    Active,
    /// Agent is configured but disabled.
    #[default]
    Inactive,
    /// Agent is being trained and cannot serve yet.
    Training,
}

impl AgentStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Training => "training",
        }
    }
}

/// Usage metrics reported for an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    /// Number of conversations handled.
    pub total_conversations: u64,
    /// Average response latency in seconds.
    pub average_response_time: f64,
    /// Satisfaction score on a 0-5 scale.
    pub satisfaction_score: f64,
}

/// A configured AI assistant profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Agent identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-friendly description.
    #[serde(default)]
    pub description: String,
    /// Free-text personality prompt.
    #[serde(default)]
    pub personality: String,
    /// Skill tags.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Lifecycle status.
    #[serde(default)]
    pub status: AgentStatus,
    /// Usage metrics, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AgentMetrics>,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Partial agent used for create payloads, updates and template configs.
///
/// Unset fields are omitted from the serialized form so the backend only
/// sees what the caller changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AgentMetrics>,
}

impl AgentPatch {
    /// Patch that only sets the lifecycle status.
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Overlay `self` on top of `base`; fields set in `self` win.
    pub fn merged_over(self, base: AgentPatch) -> AgentPatch {
        AgentPatch {
            name: self.name.or(base.name),
            description: self.description.or(base.description),
            personality: self.personality.or(base.personality),
            skills: self.skills.or(base.skills),
            model: self.model.or(base.model),
            temperature: self.temperature.or(base.temperature),
            max_tokens: self.max_tokens.or(base.max_tokens),
            status: self.status.or(base.status),
            metrics: self.metrics.or(base.metrics),
        }
    }

    /// Apply the set fields to an existing agent and bump `updated_at`.
    pub fn apply_to(&self, agent: &mut Agent) {
        if let Some(name) = &self.name {
            agent.name = name.clone();
        }
        if let Some(description) = &self.description {
            agent.description = description.clone();
        }
        if let Some(personality) = &self.personality {
            agent.personality = personality.clone();
        }
        if let Some(skills) = &self.skills {
            agent.skills = skills.clone();
        }
        if let Some(model) = &self.model {
            agent.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            agent.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            agent.max_tokens = max_tokens;
        }
        if let Some(status) = self.status {
            agent.status = status;
        }
        if let Some(metrics) = &self.metrics {
            agent.metrics = Some(metrics.clone());
        }
        agent.updated_at = Utc::now();
    }

    /// Materialize a new agent from this patch, filling defaults.
    ///
    /// Locally created agents start inactive unless the patch says otherwise.
    pub fn into_agent(self, id: String) -> Agent {
        let now = Utc::now();
        Agent {
            id,
            name: self.name.unwrap_or_else(|| "New Agent".to_string()),
            description: self.description.unwrap_or_default(),
            personality: self.personality.unwrap_or_default(),
            skills: self.skills.unwrap_or_default(),
            model: self
                .model
                .unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_AGENT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_AGENT_MAX_TOKENS),
            status: self.status.unwrap_or(AgentStatus::Inactive),
            metrics: self.metrics,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reusable starting point for new agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTemplate {
    /// Template identifier.
    pub id: String,
    /// Display name, used as the agent name unless overridden.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Default agent fields.
    #[serde(default)]
    pub config: AgentPatch,
}

//! Dashboard settings document and its built-in defaults.
//!
//! The document always carries all four sections. Partial JSON is merged
//! over the defaults before decoding, so an absent section or field falls
//! back to its default value.

use crate::loader::merge_json_values;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Complete settings for one user session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub integrations: IntegrationSettings,
    pub social_media: SocialMediaSettings,
    pub security: SecuritySettings,
}

/// UI colour scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub theme: Theme,
    pub language: String,
    pub timezone: String,
    pub notifications: bool,
    pub auto_save: bool,
    pub default_model: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            notifications: true,
            auto_save: true,
            default_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct IntegrationSettings {
    pub dify: DifyIntegration,
    pub n8n: N8nIntegration,
    pub openai: OpenAiIntegration,
    pub anthropic: AnthropicIntegration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DifyIntegration {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
}

impl Default for DifyIntegration {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://localhost:5001".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct N8nIntegration {
    pub enabled: bool,
    pub api_url: String,
    pub webhook_url: String,
}

impl Default for N8nIntegration {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://localhost:5678".to_string(),
            webhook_url: "http://localhost:5678/webhook".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiIntegration {
    pub enabled: bool,
    pub api_key: String,
    pub model: String,
}

impl Default for OpenAiIntegration {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnthropicIntegration {
    pub enabled: bool,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialMediaSettings {
    pub auto_post: bool,
    pub platforms: SocialPlatforms,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SocialPlatforms {
    pub twitter: PlatformSettings,
    pub linkedin: PlatformSettings,
    pub facebook: PlatformSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformSettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySettings {
    pub two_factor_auth: bool,
    /// Session timeout in seconds.
    pub session_timeout: u64,
    pub ip_whitelist: Vec<String>,
    /// Requests per minute.
    pub api_rate_limit: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            two_factor_auth: false,
            session_timeout: 3600,
            ip_whitelist: Vec::new(),
            api_rate_limit: 100,
        }
    }
}

/// Top-level settings section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsSection {
    General,
    Integrations,
    SocialMedia,
    Security,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 4] = [
        SettingsSection::General,
        SettingsSection::Integrations,
        SettingsSection::SocialMedia,
        SettingsSection::Security,
    ];

    /// JSON key and route segment of the section.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsSection::General => "general",
            SettingsSection::Integrations => "integrations",
            SettingsSection::SocialMedia => "socialMedia",
            SettingsSection::Security => "security",
        }
    }
}

impl fmt::Display for SettingsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsSection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "general" => Ok(SettingsSection::General),
            "integrations" => Ok(SettingsSection::Integrations),
            "socialMedia" | "social-media" | "social_media" => Ok(SettingsSection::SocialMedia),
            "security" => Ok(SettingsSection::Security),
            other => Err(format!("unknown settings section: {other}")),
        }
    }
}

/// Third-party integration that can be connection-tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationKind {
    Dify,
    N8n,
    OpenAi,
    Anthropic,
}

impl IntegrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationKind::Dify => "dify",
            IntegrationKind::N8n => "n8n",
            IntegrationKind::OpenAi => "openai",
            IntegrationKind::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dify" => Ok(IntegrationKind::Dify),
            "n8n" => Ok(IntegrationKind::N8n),
            "openai" => Ok(IntegrationKind::OpenAi),
            "anthropic" => Ok(IntegrationKind::Anthropic),
            other => Err(format!("unknown integration: {other}")),
        }
    }
}

impl Settings {
    /// Defaults as a JSON value.
    pub fn defaults_value() -> Value {
        serde_json::to_value(Settings::default()).unwrap_or(Value::Null)
    }

    /// Serialize one section to JSON.
    pub fn section_value(&self, section: SettingsSection) -> Result<Value, serde_json::Error> {
        match section {
            SettingsSection::General => serde_json::to_value(&self.general),
            SettingsSection::Integrations => serde_json::to_value(&self.integrations),
            SettingsSection::SocialMedia => serde_json::to_value(&self.social_media),
            SettingsSection::Security => serde_json::to_value(&self.security),
        }
    }

    /// Decode `value` and store it as `section`. State is unchanged on error.
    pub fn set_section_value(
        &mut self,
        section: SettingsSection,
        value: Value,
    ) -> Result<(), serde_json::Error> {
        match section {
            SettingsSection::General => self.general = serde_json::from_value(value)?,
            SettingsSection::Integrations => self.integrations = serde_json::from_value(value)?,
            SettingsSection::SocialMedia => self.social_media = serde_json::from_value(value)?,
            SettingsSection::Security => self.security = serde_json::from_value(value)?,
        }
        Ok(())
    }

    /// Deep-merge a JSON patch into one section.
    pub fn merge_section(
        &mut self,
        section: SettingsSection,
        patch: &Value,
    ) -> Result<(), serde_json::Error> {
        let mut current = self.section_value(section)?;
        merge_json_values(&mut current, patch);
        self.set_section_value(section, current)
    }

    /// Reset one section to its default.
    pub fn reset_section(&mut self, section: SettingsSection) {
        let defaults = Settings::default();
        match section {
            SettingsSection::General => self.general = defaults.general,
            SettingsSection::Integrations => self.integrations = defaults.integrations,
            SettingsSection::SocialMedia => self.social_media = defaults.social_media,
            SettingsSection::Security => self.security = defaults.security,
        }
    }

    /// Settings of a single integration as JSON.
    pub fn integration_value(&self, kind: IntegrationKind) -> Result<Value, serde_json::Error> {
        match kind {
            IntegrationKind::Dify => serde_json::to_value(&self.integrations.dify),
            IntegrationKind::N8n => serde_json::to_value(&self.integrations.n8n),
            IntegrationKind::OpenAi => serde_json::to_value(&self.integrations.openai),
            IntegrationKind::Anthropic => serde_json::to_value(&self.integrations.anthropic),
        }
    }

    /// Build settings from arbitrary JSON, merged over the defaults.
    ///
    /// Sections that fail to decode keep their defaults and are returned so
    /// the caller can report them.
    pub fn from_value_forgiving(value: &Value) -> (Settings, Vec<SettingsSection>) {
        let mut merged = Settings::defaults_value();
        merge_json_values(&mut merged, value);

        let mut settings = Settings::default();
        let mut rejected = Vec::new();
        for section in SettingsSection::ALL {
            let Some(section_value) = merged.get(section.as_str()) else {
                continue;
            };
            if settings
                .set_section_value(section, section_value.clone())
                .is_err()
            {
                rejected.push(section);
            }
        }
        (settings, rejected)
    }
}

/// Partial update for the general section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Partial update for the integrations section; each integration is replaced whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IntegrationSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dify: Option<DifyIntegration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n8n: Option<N8nIntegration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiIntegration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<AnthropicIntegration>,
}

/// Partial update for the social-media section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_post: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<SocialPlatforms>,
}

/// Partial update for the security section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_factor_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_whitelist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_rate_limit: Option<u32>,
}

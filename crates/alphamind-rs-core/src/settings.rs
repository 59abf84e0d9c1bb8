//! Settings store: section updates, integration checks, reset and import/export.

use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent, StoreKind};
use crate::state::{StateCell, StatusTracker, StoreStatus};
use crate::transport::Endpoint;
use alphamind_rs_config::{
    GeneralSettingsPatch, IntegrationKind, IntegrationSettingsPatch, SecuritySettingsPatch,
    Settings, SettingsSection, SettingsStoreConfig, SocialMediaSettingsPatch,
};
use alphamind_rs_protocol::Transport;
use log::{info, warn};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::watch;

const DEFAULT_SUCCESS_RATE: f64 = 0.7;

#[derive(Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    settings: Value,
}

#[derive(Deserialize)]
struct IntegrationCheck {
    #[serde(default)]
    success: bool,
}

pub struct SettingsStore {
    endpoint: Endpoint,
    settings: StateCell<Settings>,
    status: StatusTracker,
    events: EventBus,
    fallback_success_rate: f64,
}

impl SettingsStore {
    /// Create a store holding the default settings.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_path: &str,
        config: &SettingsStoreConfig,
        events: EventBus,
    ) -> Self {
        let rate = config.integration_fallback_success_rate;
        let fallback_success_rate = if (0.0..=1.0).contains(&rate) {
            rate
        } else {
            warn!(
                "integration success rate out of range, using default (rate={})",
                rate
            );
            DEFAULT_SUCCESS_RATE
        };
        Self {
            endpoint: Endpoint::new(transport, base_path),
            settings: StateCell::new(Settings::default()),
            status: StatusTracker::new(StoreKind::Settings, events.clone()),
            events,
            fallback_success_rate,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    /// Load settings from the backend, merged over the defaults.
    pub async fn refresh_settings(&self) {
        let _loading = self.status.begin();
        match self
            .endpoint
            .fetch::<SettingsEnvelope>(self.endpoint.get(""))
            .await
        {
            Ok(envelope) => {
                let (settings, rejected) = Settings::from_value_forgiving(&as_object(envelope.settings));
                if !rejected.is_empty() {
                    warn!(
                        "backend settings sections replaced with defaults (sections={})",
                        section_names(&rejected)
                    );
                }
                self.apply(settings);
            }
            Err(err) => {
                self.status.record("refresh_settings", &err);
                self.apply(Settings::default());
            }
        }
    }

    /// Merge a JSON patch into one section, remotely first.
    ///
    /// The section returned by the backend is merged when the call succeeds;
    /// otherwise the patch itself is. Fails with `InvalidInput` when the
    /// merged section no longer decodes, leaving state unchanged.
    pub async fn update_section(
        &self,
        section: SettingsSection,
        patch: Value,
    ) -> Result<Settings, StoreError> {
        let _loading = self.status.begin();
        if !patch.is_object() {
            return Err(StoreError::InvalidInput(format!(
                "{section} update must be a JSON object"
            )));
        }
        let request = self
            .endpoint
            .put(&format!("/{}", section.as_str()))
            .with_json(patch.clone());
        let overlay = match self.endpoint.send(request).await {
            Ok(returned) if returned.is_object() => returned,
            Ok(_) => patch,
            Err(err) => {
                self.status.record("update_settings", &err);
                patch
            }
        };
        let mut next = self.settings.get();
        next.merge_section(section, &overlay)
            .map_err(|err| StoreError::InvalidInput(format!("{section} settings: {err}")))?;
        self.apply(next.clone());
        Ok(next)
    }

    pub async fn update_general_settings(
        &self,
        updates: GeneralSettingsPatch,
    ) -> Result<Settings, StoreError> {
        self.update_section(SettingsSection::General, serde_json::to_value(updates)?)
            .await
    }

    pub async fn update_integration_settings(
        &self,
        updates: IntegrationSettingsPatch,
    ) -> Result<Settings, StoreError> {
        self.update_section(SettingsSection::Integrations, serde_json::to_value(updates)?)
            .await
    }

    pub async fn update_social_media_settings(
        &self,
        updates: SocialMediaSettingsPatch,
    ) -> Result<Settings, StoreError> {
        self.update_section(SettingsSection::SocialMedia, serde_json::to_value(updates)?)
            .await
    }

    pub async fn update_security_settings(
        &self,
        updates: SecuritySettingsPatch,
    ) -> Result<Settings, StoreError> {
        self.update_section(SettingsSection::Security, serde_json::to_value(updates)?)
            .await
    }

    /// Check connectivity of one integration with its current settings.
    ///
    /// Without a backend the outcome is random with the configured success rate.
    pub async fn test_integration(&self, kind: IntegrationKind) -> bool {
        self.status.clear_error();
        let body = self
            .settings
            .read(|settings| settings.integration_value(kind))
            .unwrap_or(Value::Null);
        let request = self
            .endpoint
            .post(&format!("/integrations/{}/test", kind.as_str()))
            .with_json(body);
        match self.endpoint.fetch::<IntegrationCheck>(request).await {
            Ok(check) => check.success,
            Err(err) => {
                self.status.record("test_integration", &err);
                rand::rng().random_bool(self.fallback_success_rate)
            }
        }
    }

    /// Reset one section, or everything, to defaults. Applied locally even
    /// when the backend reset fails.
    pub async fn reset_settings(&self, section: Option<SettingsSection>) {
        let _loading = self.status.begin();
        let path = match section {
            Some(section) => format!("/{}/reset", section.as_str()),
            None => "/reset".to_string(),
        };
        if let Err(err) = self.endpoint.send(self.endpoint.post(&path)).await {
            self.status.record("reset_settings", &err);
        }
        let next = match section {
            Some(section) => {
                let mut next = self.settings.get();
                next.reset_section(section);
                next
            }
            None => Settings::default(),
        };
        info!(
            "settings reset (section={})",
            section.map(|section| section.as_str()).unwrap_or("all")
        );
        self.apply(next);
    }

    /// Pretty-printed JSON of the current settings.
    pub fn export_settings(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.settings.get())?)
    }

    /// Replace settings with an exported document.
    ///
    /// Malformed JSON fails with `Parse` and leaves state unchanged. Sections
    /// that do not decode are replaced by their defaults and reported in the
    /// error field.
    pub async fn import_settings(&self, json: &str) -> Result<Settings, StoreError> {
        let _loading = self.status.begin();
        let value = match serde_json::from_str::<Value>(json) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => return Err(self.reject_import("expected a JSON object".to_string())),
            Err(err) => return Err(self.reject_import(err.to_string())),
        };
        let (settings, rejected) = Settings::from_value_forgiving(&value);

        let body = serde_json::to_value(&settings)?;
        if let Err(err) = self
            .endpoint
            .send(self.endpoint.post("/import").with_json(body))
            .await
        {
            self.status.record("import_settings", &err);
        }
        self.apply(settings.clone());
        if !rejected.is_empty() {
            self.status.record(
                "import_settings",
                &format!(
                    "invalid settings sections replaced with defaults: {}",
                    section_names(&rejected)
                ),
            );
        }
        info!("settings imported (rejected_sections={})", rejected.len());
        Ok(settings)
    }

    fn reject_import(&self, reason: String) -> StoreError {
        let err = StoreError::Parse(reason);
        self.status.record("import_settings", &err);
        err
    }

    fn apply(&self, settings: Settings) {
        self.settings.replace(settings.clone());
        self.events
            .emit(StoreEvent::SettingsChanged(Box::new(settings)));
    }
}

fn as_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        _ => Value::Object(Map::new()),
    }
}

fn section_names(sections: &[SettingsSection]) -> String {
    sections
        .iter()
        .map(SettingsSection::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Layered configuration loader.
//!
//! Discovers configuration layers (user, cwd, runtime overrides), merges them
//! recursively in precedence order and produces a validated `ClientConfig`.

mod merge;

#[cfg(test)]
mod tests;

pub use merge::merge_json_values;

use crate::{ClientConfig, ConfigError};
use directories::UserDirs;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "alphamind.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".alphamind";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: ClientConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory searched for a local config file.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.alphamind/alphamind.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last; these must exist.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ClientConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value)
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime overrides.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());

        let candidates = [
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (
                ConfigLayerSource::Cwd,
                Some(options.cwd.join(DEFAULT_CONFIG_FILE)),
            ),
        ];
        for (source, path) in candidates {
            let Some(path) = path else {
                continue;
            };
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if layers
                .iter()
                .any(|layer: &ConfigLayer| layer.path == path)
            {
                debug!("skipping duplicate layer (path={})", path.display());
                continue;
            }
            merge_json_values(&mut merged, &read_layer(&path)?);
            layers.push(ConfigLayer { source, path });
        }

        for path in &options.runtime_paths {
            merge_json_values(&mut merged, &read_layer(path)?);
            debug!("loaded runtime layer (path={})", path.display());
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Runtime,
                path: path.clone(),
            });
        }

        let config = config_from_value(merged)?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(invalid("api.base_url", "must not be empty"));
        }
        for (path, value) in [
            ("api.agents_path", &self.api.agents_path),
            ("api.chat_path", &self.api.chat_path),
            ("api.data_path", &self.api.data_path),
            ("api.settings_path", &self.api.settings_path),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(path, "must start with '/'"));
            }
        }
        if self.chat.history_window == 0 {
            return Err(invalid("chat.history_window", "must be at least 1"));
        }
        let rate = self.settings.integration_fallback_success_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(invalid(
                "settings.integration_fallback_success_rate",
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn read_layer(path: &Path) -> Result<Value, ConfigError> {
    debug!("reading config layer (path={})", path.display());
    let contents = fs::read_to_string(path)?;
    Ok(json5::from_str(&contents)?)
}

fn config_from_value(value: Value) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

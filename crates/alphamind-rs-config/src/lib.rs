//! Client configuration and the dashboard settings schema.
//!
//! This crate owns the `ClientConfig` model with its layered JSON5 loader,
//! and the `Settings` document managed by the settings store together with
//! its built-in defaults and merge helpers.

mod error;
mod loader;
mod model;
mod settings;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Recursive JSON merge used for config layers and settings patches.
pub use loader::merge_json_values;
/// Client configuration models.
pub use model::*;
/// Settings document, sections and patches.
pub use settings::*;

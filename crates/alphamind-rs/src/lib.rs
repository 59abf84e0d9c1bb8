//! Public SDK surface for AlphaMind.
//!
//! This crate re-exports the store building blocks and provides small
//! helpers that keep config loading and logging setup consistent.

use std::path::Path;
use std::sync::Arc;

/// Re-export for convenience.
pub use alphamind_rs_config as config;
pub use alphamind_rs_core as core;
/// Re-export for convenience.
pub use alphamind_rs_protocol as protocol;

pub use alphamind_rs_core::{DashboardSummary, HttpTransport, StoreError, Workspace};

use alphamind_rs_config::{ClientConfig, ConfigError};
use alphamind_rs_protocol::TransportError;
use log::info;

/// Initialize env_logger with millisecond timestamps, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

/// Resolve the client config.
///
/// An explicit `path` is loaded on its own; otherwise the layered stack for
/// `cwd` is used. `base_url` overrides `api.base_url` and the result is
/// validated again.
pub fn load_config(
    path: Option<&Path>,
    cwd: &Path,
    base_url: Option<&str>,
) -> Result<ClientConfig, ConfigError> {
    let mut config = match path {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::load_layered(cwd)?.config,
    };
    if let Some(base_url) = base_url {
        config.api.base_url = base_url.to_string();
        config.validate()?;
    }
    Ok(config)
}

/// Build an HTTP-backed workspace and run its initial loads.
pub async fn connect(config: &ClientConfig) -> Result<Workspace, TransportError> {
    let transport = HttpTransport::from_config(&config.api)?;
    info!("connecting workspace (base_url={})", transport.base_url());
    Ok(Workspace::connect(config, Arc::new(transport)).await)
}

//! Tests for configuration loading.

use super::*;
use crate::{DatasetDeletePolicy, UploadFailurePolicy};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = ClientConfig::load_from_str("{}").expect("config");
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.api.agents_path, "/api/agents");
    assert_eq!(config.chat.history_window, 10);
    assert_eq!(config.data.processing_delay_ms, 2000);
    assert_eq!(config.data.indexing_delay_ms, 3000);
}

#[test]
fn parses_policies_and_comments() {
    let json5 = r#"{
        // dev backend
        api: { base_url: "http://127.0.0.1:8080" },
        data: { upload_failure_policy: "mark_error", dataset_delete_policy: "cascade_files" },
    }"#;
    let config = ClientConfig::load_from_str(json5).expect("config");
    assert_eq!(config.api.base_url, "http://127.0.0.1:8080");
    assert_eq!(config.data.upload_failure_policy, UploadFailurePolicy::MarkError);
    assert_eq!(
        config.data.dataset_delete_policy,
        DatasetDeletePolicy::CascadeFiles
    );
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = ClientConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown field"));
}

#[test]
fn rejects_out_of_range_success_rate() {
    let err = ClientConfig::load_from_str(
        "{ settings: { integration_fallback_success_rate: 1.5 } }",
    )
    .unwrap_err();
    match err {
        ConfigError::Invalid { path, .. } => {
            assert_eq!(path, "settings.integration_fallback_success_rate")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn rejects_relative_route_prefix() {
    let err = ClientConfig::load_from_str("{ api: { chat_path: \"api/chat\" } }").unwrap_err();
    assert!(format!("{err}").contains("api.chat_path"));
}

/// Later layers override earlier ones key by key.
#[test]
fn layered_config_prefers_runtime_over_cwd_over_user() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");

    let user_config = root.join("home").join("alphamind.json5");
    write_json5(
        &user_config,
        "{ api: { base_url: \"http://user\" }, chat: { history_window: 4 } }",
    );
    write_json5(
        &cwd.join("alphamind.json5"),
        "{ api: { base_url: \"http://cwd\" } }",
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ data: { processing_delay_ms: 5 } }");

    let options = LayeredConfigOptions {
        cwd: cwd.clone(),
        user_config_path: Some(user_config.clone()),
        runtime_paths: Vec::new(),
    }
    .with_runtime_path(&runtime);
    let layered = ClientConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.api.base_url, "http://cwd");
    assert_eq!(layered.config.chat.history_window, 4);
    assert_eq!(layered.config.data.processing_delay_ms, 5);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime
        ]
    );
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions {
        cwd: temp.path().to_path_buf(),
        user_config_path: None,
        runtime_paths: vec![temp.path().join("missing.json5")],
    };
    let err = ClientConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

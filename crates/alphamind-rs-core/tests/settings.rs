//! Settings store integration tests.

use alphamind_rs_config::{
    GeneralSettingsPatch, IntegrationKind, SecuritySettingsPatch, Settings, SettingsSection,
    SettingsStoreConfig, Theme,
};
use alphamind_rs_core::{EventBus, SettingsStore, StoreError, StoreEvent};
use alphamind_rs_protocol::{Method, Transport};
use alphamind_rs_test_utils::{FailingTransport, InMemoryBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn settings_store(transport: Arc<dyn Transport>) -> SettingsStore {
    SettingsStore::new(
        transport,
        "/api/settings",
        &SettingsStoreConfig::default(),
        EventBus::default(),
    )
}

/// Section updates reach the backend and survive a refresh.
#[tokio::test]
async fn section_update_survives_refresh() {
    let backend = InMemoryBackend::new();
    let store = settings_store(Arc::new(backend.clone()));

    let updated = store
        .update_general_settings(GeneralSettingsPatch {
            theme: Some(Theme::Dark),
            timezone: Some("Europe/Berlin".to_string()),
            ..GeneralSettingsPatch::default()
        })
        .await
        .expect("update");
    store.refresh_settings().await;

    assert_eq!(store.settings(), updated);
    assert_eq!(updated.general.theme, Theme::Dark);
    assert_eq!(updated.general.language, "en");
    assert_eq!(
        backend.settings(),
        json!({ "general": { "theme": "dark", "timezone": "Europe/Berlin" } })
    );
    assert_eq!(store.status().error, None);
}

/// Export then import restores every field.
#[tokio::test]
async fn export_import_round_trip() {
    let store = settings_store(Arc::new(FailingTransport::new()));
    store
        .update_security_settings(SecuritySettingsPatch {
            two_factor_auth: Some(true),
            ip_whitelist: Some(vec!["10.0.0.1".to_string()]),
            ..SecuritySettingsPatch::default()
        })
        .await
        .expect("update");
    let before = store.settings();
    let exported = store.export_settings().expect("export");

    store.reset_settings(None).await;
    assert_eq!(store.settings(), Settings::default());
    let imported = store.import_settings(&exported).await.expect("import");

    assert_eq!(imported, before);
    assert_eq!(store.settings(), before);
}

/// Invalid sections fall back to defaults while valid ones are kept.
#[tokio::test]
async fn import_replaces_invalid_sections_with_defaults() {
    let backend = InMemoryBackend::new();
    let store = settings_store(Arc::new(backend.clone()));
    let document = json!({
        "general": { "theme": "neon" },
        "security": { "sessionTimeout": 60 }
    });

    let imported = store
        .import_settings(&document.to_string())
        .await
        .expect("import");

    assert_eq!(imported.general, Settings::default().general);
    assert_eq!(imported.security.session_timeout, 60);
    assert!(store.status().error.expect("error").contains("general"));
    assert_eq!(backend.settings()["security"]["sessionTimeout"], json!(60));
}

/// Non-object documents are parse errors and change nothing.
#[tokio::test]
async fn import_of_non_object_is_rejected() {
    let store = settings_store(Arc::new(InMemoryBackend::new()));

    let err = store.import_settings("[1, 2, 3]").await.unwrap_err();

    assert!(matches!(err, StoreError::Parse(_)));
    assert_eq!(store.settings(), Settings::default());
}

/// Resetting one section keeps the others.
#[tokio::test]
async fn section_reset_keeps_other_sections() {
    let backend = InMemoryBackend::new();
    let store = settings_store(Arc::new(backend.clone()));
    store
        .update_section(SettingsSection::General, json!({ "language": "de" }))
        .await
        .expect("general");
    store
        .update_section(SettingsSection::Security, json!({ "apiRateLimit": 5 }))
        .await
        .expect("security");

    store.reset_settings(Some(SettingsSection::Security)).await;

    let settings = store.settings();
    assert_eq!(settings.general.language, "de");
    assert_eq!(settings.security, Settings::default().security);
    assert!(
        backend
            .requests()
            .iter()
            .any(|request| request.method == Method::Post
                && request.path == "/api/settings/security/reset")
    );
}

/// Integration checks post the integration's current settings.
#[tokio::test]
async fn integration_check_posts_current_settings() {
    let backend = InMemoryBackend::new();
    let store = settings_store(Arc::new(backend.clone()));
    store
        .update_section(
            SettingsSection::Integrations,
            json!({ "openai": { "enabled": true, "apiKey": "sk-test", "model": "gpt-4" } }),
        )
        .await
        .expect("update");

    assert!(store.test_integration(IntegrationKind::OpenAi).await);

    let request = backend.requests().pop().expect("request");
    assert_eq!(request.path, "/api/settings/integrations/openai/test");
    let body = request.json().expect("body");
    assert_eq!(body["apiKey"], json!("sk-test"));
    assert_eq!(body["enabled"], json!(true));
}

/// Every applied change is broadcast with the full document.
#[tokio::test]
async fn changes_are_broadcast() {
    let events = EventBus::default();
    let mut receiver = events.subscribe();
    let store = SettingsStore::new(
        Arc::new(InMemoryBackend::new()),
        "/api/settings",
        &SettingsStoreConfig::default(),
        events,
    );

    let updated = store
        .update_section(SettingsSection::SocialMedia, json!({ "autoPost": true }))
        .await
        .expect("update");

    match receiver.recv().await.expect("event") {
        StoreEvent::SettingsChanged(settings) => assert_eq!(*settings, updated),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(updated.social_media.auto_post);
}

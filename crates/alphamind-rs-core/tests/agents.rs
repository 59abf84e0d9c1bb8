//! Agent store integration tests.

use alphamind_rs_core::{AgentStore, EventBus, StoreError, StoreEvent, StoreKind};
use alphamind_rs_protocol::{AgentPatch, AgentStatus, Method};
use alphamind_rs_test_utils::{FailingTransport, InMemoryBackend, StubTransport};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn store_for(backend: &InMemoryBackend) -> AgentStore {
    AgentStore::new(Arc::new(backend.clone()), "/api/agents", EventBus::default())
}

/// A created agent survives a refresh from the backend.
#[tokio::test]
async fn created_agent_is_listed_after_refresh() {
    let backend = InMemoryBackend::new();
    let store = store_for(&backend);

    let agent = store
        .create_agent(AgentPatch {
            name: Some("Researcher".to_string()),
            model: Some("gpt-4".to_string()),
            ..AgentPatch::default()
        })
        .await
        .expect("create");
    store.refresh_agents().await;

    assert_eq!(store.agents(), vec![agent.clone()]);
    assert_eq!(backend.agents(), vec![agent]);
    assert_eq!(store.status().error, None);
}

/// Remote update results are mirrored locally.
#[tokio::test]
async fn activate_round_trips_through_backend() {
    let backend = InMemoryBackend::new();
    let store = store_for(&backend);
    let agent = store.create_agent(AgentPatch::default()).await.expect("create");

    store.activate_agent(&agent.id).await.expect("activate");

    assert_eq!(
        store.agent(&agent.id).expect("agent").status,
        AgentStatus::Active
    );
    assert_eq!(backend.agents()[0].status, AgentStatus::Active);
}

/// Deleting twice is harmless and the second call records the 404.
#[tokio::test]
async fn delete_is_idempotent() {
    let backend = InMemoryBackend::new();
    let store = store_for(&backend);
    let agent = store.create_agent(AgentPatch::default()).await.expect("create");

    store.delete_agent(&agent.id).await;
    assert_eq!(store.status().error, None);
    store.delete_agent(&agent.id).await;

    assert!(store.agents().is_empty());
    assert!(backend.agents().is_empty());
    assert!(store.status().error.expect("error").contains("404"));
}

/// Unknown templates are reported instead of silently creating an agent.
#[tokio::test]
async fn unknown_template_is_not_found() {
    let store = AgentStore::new(
        Arc::new(FailingTransport::new()),
        "/api/agents",
        EventBus::default(),
    );
    store.load_templates().await;

    let err = store
        .create_from_template("nope", AgentPatch::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound { kind: "template", .. }));
    assert!(store.agents().is_empty());
}

/// Template config is the base and caller customizations win.
#[tokio::test]
async fn template_customizations_override_template_config() {
    let store = AgentStore::new(
        Arc::new(FailingTransport::new()),
        "/api/agents",
        EventBus::default(),
    );
    store.load_templates().await;
    assert_eq!(store.status().error, None);

    let agent = store
        .create_from_template(
            "sales-assistant",
            AgentPatch {
                temperature: Some(0.1),
                ..AgentPatch::default()
            },
        )
        .await
        .expect("agent");

    assert_eq!(agent.name, "Sales Assistant");
    assert_eq!(agent.model, "gpt-4");
    assert_eq!(agent.temperature, 0.1);
    assert_eq!(agent.skills, vec!["sales", "product knowledge"]);
}

/// Test prompts and metrics go to the per-agent routes.
#[tokio::test]
async fn test_prompt_and_metrics_use_backend() {
    let backend = InMemoryBackend::new();
    let store = store_for(&backend);
    let agent = store
        .create_agent(AgentPatch {
            name: Some("Echo".to_string()),
            ..AgentPatch::default()
        })
        .await
        .expect("create");

    let reply = store.test_agent(&agent.id, "ping").await;
    let metrics = store.get_agent_metrics(&agent.id).await;

    assert_eq!(reply, "Echo received: ping");
    assert_eq!(metrics.total_conversations, 3);
    assert_eq!(store.agent(&agent.id).expect("agent").metrics, Some(metrics));
    let paths: Vec<String> = backend
        .requests()
        .iter()
        .filter(|request| request.method != Method::Post || request.path != "/api/agents")
        .map(|request| request.path.clone())
        .collect();
    assert_eq!(
        paths,
        vec![
            format!("/api/agents/{}/test", agent.id),
            format!("/api/agents/{}/metrics", agent.id),
        ]
    );
}

/// Offline failures are broadcast on the event bus.
#[tokio::test]
async fn offline_refresh_emits_error_event() {
    let events = EventBus::default();
    let mut receiver = events.subscribe();
    let store = AgentStore::new(Arc::new(FailingTransport::new()), "/api/agents", events);

    store.refresh_agents().await;

    assert_eq!(store.agents().len(), 2);
    match receiver.recv().await.expect("event") {
        StoreEvent::Error { store, message } => {
            assert_eq!(store, StoreKind::Agents);
            assert!(message.contains("connection refused"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

/// A create reply with only an id still counts as a backend success.
#[tokio::test]
async fn sparse_create_reply_keeps_backend_agent_id() {
    let stub = StubTransport::new().respond(Method::Post, "/api/agents", json!({ "id": "a9" }));
    let store = AgentStore::new(Arc::new(stub), "/api/agents", EventBus::default());

    let agent = store
        .create_agent(AgentPatch {
            name: Some("Scout".to_string()),
            ..AgentPatch::default()
        })
        .await
        .expect("create");

    assert_eq!(agent.id, "a9");
    assert_eq!(agent.name, "Scout");
    assert_eq!(agent.status, AgentStatus::Inactive);
    assert_eq!(store.agent("a9"), Some(agent));
    assert_eq!(store.status().error, None);
}

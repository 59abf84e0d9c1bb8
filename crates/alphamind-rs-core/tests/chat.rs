//! Chat store integration tests.

use alphamind_rs_config::ChatConfig;
use alphamind_rs_core::chat::{EMPTY_REPLY_TEXT, SEND_FAILED_TEXT};
use alphamind_rs_core::{ChatStore, EventBus, StoreError, StoreEvent};
use alphamind_rs_protocol::{ChatRequest, Method, Role, Transport};
use alphamind_rs_test_utils::{InMemoryBackend, StubTransport};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn chat_store(transport: Arc<dyn Transport>, config: ChatConfig) -> ChatStore {
    ChatStore::new(transport, "/api/chat", &config, EventBus::default())
}

fn sent_history(stub: &StubTransport) -> Vec<usize> {
    stub.requests_to(Method::Post, "/api/chat")
        .iter()
        .map(|request| {
            let body: ChatRequest =
                serde_json::from_value(request.json().cloned().expect("json body"))
                    .expect("chat request");
            body.history.len()
        })
        .collect()
}

/// Replies are appended after the user message, with metadata.
#[tokio::test]
async fn reply_follows_user_message() {
    let store = chat_store(Arc::new(InMemoryBackend::new()), ChatConfig::default());

    store.send_message("  hello  ").await.expect("send");
    store.send_message("again").await.expect("send");

    let messages = store.messages();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello", "echo: hello", "again", "echo: again"]);
    assert_eq!(messages[1].role, Role::Assistant);
    let metadata = messages[3].metadata.as_ref().expect("metadata");
    assert_eq!(metadata.get("historyLength"), Some(&json!(2)));
    assert_eq!(store.status().error, None);
}

/// Only the configured number of earlier messages is sent as context.
#[tokio::test]
async fn history_is_bounded_by_window() {
    let stub = StubTransport::new().respond(Method::Post, "/api/chat", json!({ "message": "ok" }));
    let store = chat_store(
        Arc::new(stub.clone()),
        ChatConfig {
            history_window: 3,
            ..ChatConfig::default()
        },
    );

    for text in ["one", "two", "three"] {
        store.send_message(text).await.expect("send");
    }

    assert_eq!(sent_history(&stub), vec![0, 2, 3]);
}

/// Empty replies are replaced by a fixed apology.
#[tokio::test]
async fn empty_reply_uses_fallback_text() {
    let stub = StubTransport::new().respond(Method::Post, "/api/chat", json!({ "message": "" }));
    let store = chat_store(Arc::new(stub), ChatConfig::default());

    store.send_message("hi").await.expect("send");

    assert_eq!(store.messages()[1].content, EMPTY_REPLY_TEXT);
}

/// A second send while one is in flight is ignored.
#[tokio::test(start_paused = true)]
async fn concurrent_send_is_a_noop() {
    let stub = StubTransport::new()
        .with_latency(Duration::from_secs(1))
        .respond(Method::Post, "/api/chat", json!({ "message": "done" }));
    let store = chat_store(Arc::new(stub.clone()), ChatConfig::default());

    let (first, second) = tokio::join!(store.send_message("first"), async {
        assert!(store.is_sending());
        store.send_message("second").await
    });

    first.expect("first");
    second.expect("second");
    assert_eq!(stub.requests().len(), 1);
    let contents: Vec<String> = store.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first", "done"]);
    assert!(!store.is_sending());
}

/// Cancelling drops the reply silently and frees the store for the next send.
#[tokio::test(start_paused = true)]
async fn cancel_discards_reply_without_error() {
    let stub = StubTransport::new()
        .with_latency(Duration::from_secs(5))
        .respond(Method::Post, "/api/chat", json!({ "message": "late" }));
    let store = chat_store(Arc::new(stub), ChatConfig::default());

    let (sent, cancelled) = tokio::join!(store.send_message("slow"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.cancel()
    });

    sent.expect("cancelled send is not an error");
    assert!(cancelled);
    assert!(!store.cancel());
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.status().error, None);
    assert!(!store.status().is_loading);

    store.send_message("next").await.expect("send");
    assert_eq!(store.messages().len(), 3);
    assert_eq!(store.messages()[2].content, "late");
}

/// A failed send leaves an error bubble and can be retried once the backend recovers.
#[tokio::test]
async fn retry_after_failure_resends_last_user_message() {
    let stub = StubTransport::new().status(Method::Post, "/api/chat", 500);
    let store = chat_store(Arc::new(stub.clone()), ChatConfig::default());

    let err = store.send_message("question").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    assert_eq!(store.messages()[1].content, SEND_FAILED_TEXT);
    assert!(store.messages()[1].is_error());
    assert!(store.status().error.is_some());

    let _ = stub
        .clone()
        .respond(Method::Post, "/api/chat", json!({ "message": "answer" }));
    store.retry_last_message().await.expect("retry");

    let contents: Vec<String> = store.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(
        contents,
        vec!["question", SEND_FAILED_TEXT, "question", "answer"]
    );
    assert_eq!(store.status().error, None);
}

/// Sent and received messages are announced on the bus in order.
#[tokio::test]
async fn send_emits_message_events() {
    let events = EventBus::default();
    let mut receiver = events.subscribe();
    let store = ChatStore::new(
        Arc::new(InMemoryBackend::new()),
        "/api/chat",
        &ChatConfig::default(),
        events,
    );
    let conversation_id = store.current_conversation().expect("current").id;

    store.send_message("ping").await.expect("send");

    match receiver.recv().await.expect("sent") {
        StoreEvent::MessageSent {
            conversation_id: id,
            message,
        } => {
            assert_eq!(id, conversation_id);
            assert_eq!(message.content, "ping");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match receiver.recv().await.expect("received") {
        StoreEvent::MessageReceived { message, .. } => assert_eq!(message.content, "echo: ping"),
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Conversations are independent and keep their own messages.
#[tokio::test]
async fn messages_stay_with_their_conversation() {
    let store = chat_store(Arc::new(InMemoryBackend::new()), ChatConfig::default());
    let first = store.current_conversation().expect("current").id;
    store.send_message("in first").await.expect("send");

    let second = store.create_conversation(Some("Side thread"));
    assert!(store.messages().is_empty());
    store.send_message("in second").await.expect("send");

    store.switch_conversation(&first);
    assert_eq!(store.messages()[0].content, "in first");
    store.clear_messages();
    assert!(store.messages().is_empty());

    store.switch_conversation(&second);
    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.conversations().len(), 2);
}

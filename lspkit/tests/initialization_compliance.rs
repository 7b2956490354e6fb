//! Initialization handshake compliance tests against the public facade.
//!
//! These tests verify the initialize/initialized sequence as a client sees
//! it: wire shapes, request gating before the handshake completes, and the
//! legacy path where an empty capability tree skips `initialized`.

use lspkit::error::codes;
use lspkit::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

#[test]
fn test_client_info_wire_shape() {
    let info = ClientInfo {
        name: "test-client".to_string(),
        version: Some("1.0.0".to_string()),
    };

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["name"], "test-client");
    assert_eq!(json["version"], "1.0.0");
}

#[test]
fn test_server_info_wire_shape() {
    let info = ServerInfo::new("test-server", "2.0.0");

    assert_eq!(info.name, "test-server");
    assert_eq!(info.version.as_deref(), Some("2.0.0"));

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["name"], "test-server");
    assert_eq!(json["version"], "2.0.0");
}

#[test]
fn test_initialize_params_missing_capabilities_defaults() {
    // Clients predating the capability tree omit the field entirely.
    let params: InitializeParams = serde_json::from_value(json!({
        "processId": 42,
        "clientInfo": { "name": "legacy", "version": "0.1" }
    }))
    .unwrap();

    assert_eq!(params.process_id, Some(42));
    assert!(params.capabilities.text_document.is_none());
    assert!(params.capabilities.workspace.is_none());
}

async fn next_response(client: &mut ClientHandle) -> Response {
    loop {
        match client.recv().await.expect("connection open") {
            Message::Response(response) => return response,
            _ => continue,
        }
    }
}

fn hover_server() -> Arc<LanguageServer> {
    LanguageServer::builder(ServerInfo::new("compliance", "0.0.0"))
        .handler(
            HandlerRegistration::request(
                "textDocument/hover",
                handler_fn(|_, _| async { Ok(Some(json!({ "contents": "ok" }))) }),
            )
            .capability(CapabilityKind::Hover),
        )
        .build()
}

#[tokio::test]
async fn test_requests_gated_until_handshake_completes() {
    let server = hover_server();
    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(server, transport).run());

    // Before initialize, every request other than initialize is refused.
    client
        .send(Request::new("textDocument/hover", 1u64))
        .await
        .unwrap();
    let refused = next_response(&mut client).await;
    assert_eq!(
        refused.error.as_ref().unwrap().code,
        codes::SERVER_NOT_INITIALIZED
    );

    client
        .send(Request::with_params(
            methods::INITIALIZE,
            2u64,
            json!({ "capabilities": { "textDocument": {} } }),
        ))
        .await
        .unwrap();
    let result = next_response(&mut client).await.into_result().unwrap();
    assert_eq!(result["capabilities"]["hoverProvider"], true);

    // The client declared a capability tree, so the handshake is not done
    // until `initialized` arrives.
    client
        .send(Request::new("textDocument/hover", 3u64))
        .await
        .unwrap();
    let still_refused = next_response(&mut client).await;
    assert_eq!(
        still_refused.error.as_ref().unwrap().code,
        codes::SERVER_NOT_INITIALIZED
    );

    client
        .send(Notification::new(notifications::INITIALIZED))
        .await
        .unwrap();
    client
        .send(Request::new("textDocument/hover", 4u64))
        .await
        .unwrap();
    let result = next_response(&mut client).await.into_result().unwrap();
    assert_eq!(result["contents"], "ok");

    client
        .send(Request::new(methods::SHUTDOWN, 5u64))
        .await
        .unwrap();
    assert!(next_response(&mut client).await.is_success());
    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    assert_eq!(pump.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_legacy_client_skips_initialized() {
    let server = hover_server();
    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(Arc::clone(&server), transport).run());

    // An empty capability tree marks a legacy client; the handshake
    // completes inside initialize and no `initialized` is expected.
    client
        .send(Request::with_params(
            methods::INITIALIZE,
            1u64,
            json!({ "capabilities": {} }),
        ))
        .await
        .unwrap();
    assert!(next_response(&mut client).await.is_success());

    let mut started = server.started();
    started.wait_for(StartSignal::is_started).await.unwrap();

    client
        .send(Request::new("textDocument/hover", 2u64))
        .await
        .unwrap();
    let result = next_response(&mut client).await.into_result().unwrap();
    assert_eq!(result["contents"], "ok");

    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    // Exit without shutdown is the abnormal path.
    assert_eq!(pump.await.unwrap().unwrap(), 1);
}

#[tokio::test]
async fn test_requests_refused_after_shutdown() {
    let server = hover_server();
    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(server, transport).run());

    client
        .send(Request::with_params(
            methods::INITIALIZE,
            1u64,
            json!({ "capabilities": {} }),
        ))
        .await
        .unwrap();
    assert!(next_response(&mut client).await.is_success());

    client
        .send(Request::new(methods::SHUTDOWN, 2u64))
        .await
        .unwrap();
    let shutdown = next_response(&mut client).await;
    assert!(shutdown.is_success());
    assert_eq!(shutdown.result, Some(Value::Null));

    client
        .send(Request::new("textDocument/hover", 3u64))
        .await
        .unwrap();
    let refused = next_response(&mut client).await;
    assert_eq!(refused.error.as_ref().unwrap().code, codes::INVALID_REQUEST);

    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    assert_eq!(pump.await.unwrap().unwrap(), 0);
}

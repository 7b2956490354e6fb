//! End-to-end session tests over an in-memory transport.
//!
//! These drive a real [`ServerRuntime`] with a scripted client: the full
//! handshake, dynamic capability registration and retraction, document
//! sync ordering, and the shutdown/exit sequence.

use lspkit_core::capability::{CapabilityKind, ServerInfo};
use lspkit_core::protocol::{Message, Notification, Request, Response, methods, notifications};
use lspkit_core::registration::{
    TextDocumentChangeRegistrationOptions, TextDocumentRegistrationOptions,
};
use lspkit_core::capability::TextDocumentSyncKind;
use lspkit_core::selector::DocumentSelector;
use lspkit_server::handler::{HandlerRegistration, handler_fn};
use lspkit_server::lifecycle::{LanguageServer, StartSignal};
use lspkit_server::runtime::{ClientHandle, MemoryTransport, ServerRuntime};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

async fn next_response(client: &mut ClientHandle) -> Response {
    loop {
        match client.recv().await.expect("connection open") {
            Message::Response(response) => return response,
            _ => continue,
        }
    }
}

async fn next_request(client: &mut ClientHandle) -> Request {
    loop {
        match client.recv().await.expect("connection open") {
            Message::Request(request) => return request,
            _ => continue,
        }
    }
}

async fn handshake(client: &mut ClientHandle, capabilities: Value) {
    client
        .send(Request::with_params(
            methods::INITIALIZE,
            1u64,
            json!({ "capabilities": capabilities }),
        ))
        .await
        .unwrap();
    assert!(next_response(client).await.is_success());
    client
        .send(Notification::new(notifications::INITIALIZED))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dynamic_registration_round_trip() {
    let server = LanguageServer::builder(ServerInfo::new("integration", "0.0.0"))
        .handler(
            HandlerRegistration::request(
                "textDocument/hover",
                handler_fn(|_, _| async { Ok(Some(json!({"contents": "doc"}))) }),
            )
            .capability(CapabilityKind::Hover)
            .options(TextDocumentRegistrationOptions::for_selector(
                DocumentSelector::for_language("rust"),
            )),
        )
        .build();

    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(Arc::clone(&server), transport).run());

    handshake(
        &mut client,
        json!({ "textDocument": { "hover": { "dynamicRegistration": true } } }),
    )
    .await;

    // The server owes a registration for hover and flushes it now.
    let register = next_request(&mut client).await;
    assert_eq!(register.method(), methods::CLIENT_REGISTER_CAPABILITY);
    let params = register.params.clone().unwrap();
    let registration = &params["registrations"][0];
    assert_eq!(registration["method"], "textDocument/hover");
    let wire_id = registration["id"].as_str().unwrap().to_string();
    assert!(!wire_id.is_empty());
    assert_eq!(
        registration["registerOptions"]["documentSelector"][0]["language"],
        "rust"
    );
    client
        .send(Response::success(register.id.clone(), Value::Null))
        .await
        .unwrap();

    // The start signal settles only after the flush completed.
    let mut started = server.started();
    started.wait_for(StartSignal::is_started).await.unwrap();

    let entry = server
        .registry()
        .snapshot()
        .into_iter()
        .next()
        .expect("hover handler registered");
    assert_eq!(entry.dynamic_id.as_deref(), Some(wire_id.as_str()));

    // Removing the handler retracts exactly that wire id, with the
    // protocol's historical field spelling.
    let remover = {
        let server = Arc::clone(&server);
        let peer = server.peer();
        tokio::spawn(async move { server.remove_handler(entry.id, &peer).await })
    };
    let unregister = next_request(&mut client).await;
    assert_eq!(unregister.method(), methods::CLIENT_UNREGISTER_CAPABILITY);
    let params = unregister.params.clone().unwrap();
    assert_eq!(params["unregisterations"][0]["id"], wire_id);
    assert_eq!(params["unregisterations"][0]["method"], "textDocument/hover");
    client
        .send(Response::success(unregister.id.clone(), Value::Null))
        .await
        .unwrap();
    remover.await.unwrap().unwrap();
    assert!(!server.registry().has_method("textDocument/hover"));

    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    let code = pump.await.unwrap().unwrap();
    assert_eq!(code, 1); // no shutdown first
}

#[tokio::test]
async fn test_registration_flush_completes_under_notification_backlog() {
    let opened = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&opened);

    let server = LanguageServer::builder(ServerInfo::new("integration", "0.0.0"))
        .handler(
            HandlerRegistration::request(
                "textDocument/hover",
                handler_fn(|_, _| async { Ok(Some(json!({"contents": "doc"}))) }),
            )
            .capability(CapabilityKind::Hover)
            .options(TextDocumentRegistrationOptions::for_selector(
                DocumentSelector::for_language("rust"),
            )),
        )
        .handler(HandlerRegistration::notification(
            notifications::DID_OPEN,
            handler_fn(move |_, _| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() += 1;
                    Ok(None)
                }
            }),
        ))
        .build();

    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(Arc::clone(&server), transport).run());

    handshake(
        &mut client,
        json!({ "textDocument": { "hover": { "dynamicRegistration": true } } }),
    )
    .await;

    // The flush triggered by `initialized` is awaiting the client's answer.
    // Pile a deep backlog of notifications behind it before answering; the
    // read loop must keep draining so the answer can still be correlated.
    for i in 0..100 {
        client
            .send(Notification::with_params(
                notifications::DID_OPEN,
                json!({
                    "textDocument": {
                        "uri": format!("file:///src/f{i}.rs"),
                        "languageId": "rust",
                        "version": 1,
                        "text": ""
                    }
                }),
            ))
            .await
            .unwrap();
    }

    let register = next_request(&mut client).await;
    assert_eq!(register.method(), methods::CLIENT_REGISTER_CAPABILITY);
    client
        .send(Response::success(register.id.clone(), Value::Null))
        .await
        .unwrap();

    let mut started = server.started();
    started.wait_for(StartSignal::is_started).await.unwrap();

    client
        .send(Request::new(methods::SHUTDOWN, 2u64))
        .await
        .unwrap();
    assert!(next_response(&mut client).await.is_success());
    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    assert_eq!(pump.await.unwrap().unwrap(), 0);
    assert_eq!(*opened.lock().unwrap(), 100);
}

#[tokio::test]
async fn test_document_sync_arrival_order() {
    let versions: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&versions);

    let server = LanguageServer::builder(ServerInfo::new("integration", "0.0.0"))
        .handler(
            HandlerRegistration::notification(
                notifications::DID_CHANGE,
                handler_fn(move |params, _| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let version = params
                            .as_ref()
                            .and_then(|p| p["textDocument"]["version"].as_i64())
                            .unwrap_or(-1);
                        sink.lock().unwrap().push(version);
                        Ok(None)
                    }
                }),
            )
            .options(TextDocumentChangeRegistrationOptions::new(
                DocumentSelector::for_language("rust"),
                TextDocumentSyncKind::Incremental,
            ))
            .serial(),
        )
        .build();

    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(server, transport).run());

    handshake(&mut client, json!({ "textDocument": {} })).await;

    for version in 1..=5 {
        client
            .send(Notification::with_params(
                notifications::DID_CHANGE,
                json!({
                    "textDocument": { "uri": "file:///src/lib.rs", "version": version },
                    "contentChanges": []
                }),
            ))
            .await
            .unwrap();
    }

    client
        .send(Request::new(methods::SHUTDOWN, 2u64))
        .await
        .unwrap();
    assert!(next_response(&mut client).await.is_success());
    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();

    let code = pump.await.unwrap().unwrap();
    assert_eq!(code, 0);
    assert_eq!(*versions.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_static_capability_answer_reflects_registry() {
    let server = LanguageServer::builder(ServerInfo::new("integration", "0.0.0"))
        .handler(
            HandlerRegistration::request(
                "textDocument/hover",
                handler_fn(|_, _| async { Ok(Some(Value::Null)) }),
            )
            .capability(CapabilityKind::Hover),
        )
        .handler(
            HandlerRegistration::request(
                "textDocument/completion",
                handler_fn(|_, _| async { Ok(Some(Value::Null)) }),
            )
            .capability(CapabilityKind::Completion),
        )
        .handler(
            HandlerRegistration::request(
                "completionItem/resolve",
                handler_fn(|_, _| async { Ok(Some(Value::Null)) }),
            )
            .capability(CapabilityKind::Completion)
            .implicit(),
        )
        .build();

    let (transport, mut client) = MemoryTransport::pair();
    let pump = tokio::spawn(ServerRuntime::new(server, transport).run());

    // Completion stays static; hover is offered dynamically and therefore
    // left out of the static answer.
    client
        .send(Request::with_params(
            methods::INITIALIZE,
            1u64,
            json!({
                "capabilities": {
                    "textDocument": {
                        "hover": { "dynamicRegistration": true },
                        "completion": {}
                    }
                }
            }),
        ))
        .await
        .unwrap();
    let result = next_response(&mut client).await.into_result().unwrap();
    let caps = &result["capabilities"];
    assert!(caps.get("hoverProvider").is_none());
    assert_eq!(caps["completionProvider"]["resolveProvider"], true);
    assert_eq!(result["serverInfo"]["name"], "integration");

    client
        .send(Notification::new(notifications::EXIT))
        .await
        .unwrap();
    let _ = pump.await.unwrap();
}

//! The connection runtime: message pump, concurrency, and correlation.
//!
//! [`ServerRuntime`] drives a [`LanguageServer`] over a [`Transport`].
//! The pump enforces the protocol's ordering contract:
//!
//! - Requests run concurrently once the session is initialized, each in
//!   its own task; responses go out as handlers finish, in completion
//!   order. Handshake-phase requests are processed in arrival order.
//! - Notifications are awaited inline, so document sync events reach
//!   their handlers in arrival order.
//! - `$/cancelRequest` flips the cancellation token of the in-flight
//!   request it names; the request still produces a response.
//! - Server-to-client requests made through the peer are correlated back
//!   to their callers by request id.
//!
//! The pump stops when the exit notification arrives or the transport
//! closes, and yields the process exit code.

use async_trait::async_trait;
use lspkit_core::error::{JsonRpcError, LspError, LspResult};
use lspkit_core::protocol::{notifications, Message, Notification, Request, RequestId};
use lspkit_core::session::SessionState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::context::{CancellationToken, Peer};
use crate::lifecycle::LanguageServer;

/// Inbound half of a connection.
#[async_trait]
pub trait MessageReader: Send + 'static {
    /// Receive the next message. `None` means the connection closed.
    async fn recv(&mut self) -> Option<LspResult<Message>>;
}

/// Outbound half of a connection.
#[async_trait]
pub trait MessageWriter: Send + 'static {
    /// Send one message.
    async fn send(&mut self, message: Message) -> LspResult<()>;
}

/// A bidirectional message connection.
///
/// Byte-level framing is the transport's concern; the runtime only sees
/// parsed messages.
pub trait Transport: Send + 'static {
    /// The reader half.
    type Reader: MessageReader;
    /// The writer half.
    type Writer: MessageWriter;

    /// Split into independently owned halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Value, JsonRpcError>>>>>;

/// One unit of inbound work, dispatched in arrival order.
enum WorkItem {
    Request(Request, CancellationToken),
    Notification(Notification),
}

/// The peer as seen through a live transport.
struct TransportPeer {
    outbound: mpsc::Sender<Message>,
    pending: PendingMap,
    next_id: AtomicU64,
}

#[async_trait]
impl Peer for TransportPeer {
    async fn notify(&self, method: &str, params: Option<Value>) -> LspResult<()> {
        let notification = match params {
            Some(params) => Notification::with_params(method.to_string(), params),
            None => Notification::new(method.to_string()),
        };
        self.outbound
            .send(notification.into())
            .await
            .map_err(|_| LspError::transport("connection closed"))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> LspResult<Value> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), tx);

        let mut request = Request::new(method.to_string(), id.clone());
        request.params = params;
        if self.outbound.send(request.into()).await.is_err() {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
            return Err(LspError::transport("connection closed"));
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(LspError::transport("connection closed before response")),
        }
    }
}

/// Drives one server session over one transport.
pub struct ServerRuntime<T: Transport> {
    server: Arc<LanguageServer>,
    transport: T,
}

impl<T: Transport> ServerRuntime<T> {
    /// Bind a server to a transport.
    pub fn new(server: Arc<LanguageServer>, transport: T) -> Self {
        Self { server, transport }
    }

    /// Run the message pump to completion.
    ///
    /// Returns the process exit code: zero when shutdown preceded exit,
    /// one otherwise (including when the transport closed without an exit
    /// notification).
    pub async fn run(self) -> LspResult<i32> {
        let (mut reader, mut writer) = self.transport.split();
        let server = self.server;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(64);
        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(err) = writer.send(message).await {
                    warn!(%err, "outbound send failed");
                    break;
                }
            }
        });

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let peer: Arc<dyn Peer> = Arc::new(TransportPeer {
            outbound: outbound_tx.clone(),
            pending: Arc::clone(&pending),
            next_id: AtomicU64::new(1),
        });
        let inflight: Arc<Mutex<HashMap<RequestId, CancellationToken>>> =
            Arc::new(Mutex::new(HashMap::new()));
        server.attach_peer(Arc::clone(&peer));

        // One worker dispatches inbound traffic in arrival order:
        // notifications are awaited inline; requests are awaited inline
        // until the handshake completes and are spawned at their place in
        // the order afterwards. Sequencing is thereby deterministic while
        // post-handshake request handlers still run concurrently. The
        // read loop stays free to correlate responses, so server-to-client
        // round-trips made while handling a notification (the registration
        // flush during `initialized`) complete. The queue is unbounded:
        // the read loop must never block on the worker, since the worker
        // may be awaiting a client response that only this loop can read.
        let (work_tx, mut work_rx) = mpsc::unbounded_channel::<WorkItem>();
        let work_server = Arc::clone(&server);
        let work_peer = Arc::clone(&peer);
        let work_outbound = outbound_tx.clone();
        let work_inflight = Arc::clone(&inflight);
        let worker = tokio::spawn(async move {
            while let Some(item) = work_rx.recv().await {
                match item {
                    WorkItem::Notification(notification) => {
                        work_server
                            .handle_notification(notification, Arc::clone(&work_peer))
                            .await;
                    }
                    WorkItem::Request(request, token) => {
                        // Until the handshake completes, requests are awaited
                        // inline so gating is ordered with the notifications
                        // around them. A handler spawned here could otherwise
                        // observe a handshake that completed after its place
                        // in the queue.
                        if work_server.state() != SessionState::Initialized {
                            let id = request.id.clone();
                            let response = work_server
                                .handle_request(request, Arc::clone(&work_peer), token)
                                .await;
                            work_inflight
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .remove(&id);
                            if work_outbound.send(response.into()).await.is_err() {
                                debug!("response dropped, connection closed");
                            }
                            continue;
                        }
                        let server = Arc::clone(&work_server);
                        let peer = Arc::clone(&work_peer);
                        let outbound = work_outbound.clone();
                        let inflight = Arc::clone(&work_inflight);
                        // concurrent: responses go out in completion order
                        tokio::spawn(async move {
                            let id = request.id.clone();
                            let response = server.handle_request(request, peer, token).await;
                            inflight
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .remove(&id);
                            if outbound.send(response.into()).await.is_err() {
                                debug!("response dropped, connection closed");
                            }
                        });
                    }
                }
            }
        });

        while let Some(inbound) = reader.recv().await {
            let message = match inbound {
                Ok(message) => message,
                Err(err) => {
                    warn!(%err, "malformed inbound message, skipped");
                    continue;
                }
            };
            match message {
                Message::Request(request) => {
                    // the token is registered here so a cancel arriving
                    // while the request is still queued lands
                    let token = CancellationToken::new();
                    inflight
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(request.id.clone(), token.clone());
                    if work_tx.send(WorkItem::Request(request, token)).is_err() {
                        break;
                    }
                }
                Message::Notification(notification) => {
                    if notification.method() == notifications::CANCEL_REQUEST {
                        Self::cancel_inflight(&inflight, notification.params.as_ref());
                        continue;
                    }
                    let is_exit = notification.method() == notifications::EXIT;
                    if work_tx.send(WorkItem::Notification(notification)).is_err() || is_exit {
                        break;
                    }
                }
                Message::Response(response) => {
                    let waiter = pending
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response.into_result());
                        }
                        None => debug!(id = %response.id, "response without a waiter"),
                    }
                }
            }
        }

        // drain the work queue (the exit notification included), then let
        // the writer flush and stop
        drop(work_tx);
        let _ = worker.await;
        drop(outbound_tx);
        drop(peer);
        let _ = writer_task.await;
        Ok(server.exit_code().unwrap_or(1))
    }

    fn cancel_inflight(
        inflight: &Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
        params: Option<&Value>,
    ) {
        let Some(id) = params.and_then(|p| p.get("id")) else {
            return;
        };
        let id: RequestId = match serde_json::from_value(id.clone()) {
            Ok(id) => id,
            Err(_) => return,
        };
        if let Some(token) = inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
        {
            debug!(%id, "cancellation requested");
            token.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

/// Reader half of [`MemoryTransport`].
pub struct MemoryReader {
    incoming: mpsc::Receiver<Message>,
}

#[async_trait]
impl MessageReader for MemoryReader {
    async fn recv(&mut self) -> Option<LspResult<Message>> {
        self.incoming.recv().await.map(Ok)
    }
}

/// Writer half of [`MemoryTransport`].
pub struct MemoryWriter {
    outgoing: mpsc::Sender<Message>,
}

#[async_trait]
impl MessageWriter for MemoryWriter {
    async fn send(&mut self, message: Message) -> LspResult<()> {
        self.outgoing
            .send(message)
            .await
            .map_err(|_| LspError::transport("memory channel closed"))
    }
}

/// Channel-backed transport for tests and same-process embedding.
pub struct MemoryTransport {
    reader: MemoryReader,
    writer: MemoryWriter,
}

impl MemoryTransport {
    /// A connected transport pair: the server side and a client handle.
    #[must_use]
    pub fn pair() -> (Self, ClientHandle) {
        let (client_tx, server_rx) = mpsc::channel(64);
        let (server_tx, client_rx) = mpsc::channel(64);
        (
            Self {
                reader: MemoryReader {
                    incoming: server_rx,
                },
                writer: MemoryWriter {
                    outgoing: server_tx,
                },
            },
            ClientHandle {
                to_server: client_tx,
                from_server: client_rx,
            },
        )
    }
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        (self.reader, self.writer)
    }
}

/// The client end of a [`MemoryTransport`] pair.
pub struct ClientHandle {
    /// Messages to the server.
    pub to_server: mpsc::Sender<Message>,
    /// Messages from the server.
    pub from_server: mpsc::Receiver<Message>,
}

impl ClientHandle {
    /// Send one message to the server.
    pub async fn send(&self, message: impl Into<Message>) -> LspResult<()> {
        self.to_server
            .send(message.into())
            .await
            .map_err(|_| LspError::transport("server side closed"))
    }

    /// Receive the next message from the server.
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_server.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerRegistration};
    use crate::lifecycle::LanguageServer;
    use lspkit_core::capability::ServerInfo;
    use lspkit_core::protocol::{methods, Response};

    fn echo_server() -> Arc<LanguageServer> {
        LanguageServer::builder(ServerInfo::new("echo", "0.0.0"))
            .handler(HandlerRegistration::request(
                "test/echo",
                handler_fn(|params, _| async move { Ok(Some(params.unwrap_or(Value::Null))) }),
            ))
            .build()
    }

    async fn next_response(client: &mut ClientHandle) -> Response {
        loop {
            match client.recv().await.expect("connection open") {
                Message::Response(response) => return response,
                // ignore server-initiated traffic
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_pump_round_trip_and_exit_code() {
        let (transport, mut client) = MemoryTransport::pair();
        let runtime = ServerRuntime::new(echo_server(), transport);
        let pump = tokio::spawn(runtime.run());

        client
            .send(Request::with_params(
                methods::INITIALIZE,
                1u64,
                serde_json::json!({"capabilities": {"textDocument": {}}}),
            ))
            .await
            .unwrap();
        assert!(next_response(&mut client).await.is_success());
        client
            .send(Notification::new(notifications::INITIALIZED))
            .await
            .unwrap();

        client
            .send(Request::with_params(
                "test/echo",
                2u64,
                serde_json::json!({"ping": true}),
            ))
            .await
            .unwrap();
        let response = next_response(&mut client).await;
        assert_eq!(
            response.into_result().unwrap(),
            serde_json::json!({"ping": true})
        );

        client.send(Request::new(methods::SHUTDOWN, 3u64)).await.unwrap();
        assert!(next_response(&mut client).await.is_success());
        client
            .send(Notification::new(notifications::EXIT))
            .await
            .unwrap();

        let code = pump.await.unwrap().unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_transport_close_without_exit_is_failure() {
        let (transport, client) = MemoryTransport::pair();
        let runtime = ServerRuntime::new(echo_server(), transport);
        let pump = tokio::spawn(runtime.run());

        drop(client);
        let code = pump.await.unwrap().unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_cancel_request_flips_token() {
        let server = LanguageServer::builder(ServerInfo::new("slow", "0.0.0"))
            .handler(HandlerRegistration::request(
                "test/slow",
                handler_fn(|_, ctx| async move {
                    // wait until cancelled, then report it
                    for _ in 0..200 {
                        if ctx.is_cancelled() {
                            return Err(LspError::RequestCancelled);
                        }
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    }
                    Ok(Some(Value::Null))
                }),
            ))
            .build();

        let (transport, mut client) = MemoryTransport::pair();
        let pump = tokio::spawn(ServerRuntime::new(server, transport).run());

        client
            .send(Request::with_params(
                methods::INITIALIZE,
                1u64,
                serde_json::json!({"capabilities": {"textDocument": {}}}),
            ))
            .await
            .unwrap();
        assert!(next_response(&mut client).await.is_success());
        client
            .send(Notification::new(notifications::INITIALIZED))
            .await
            .unwrap();

        client.send(Request::new("test/slow", 2u64)).await.unwrap();
        client
            .send(Notification::with_params(
                notifications::CANCEL_REQUEST,
                serde_json::json!({"id": 2}),
            ))
            .await
            .unwrap();

        let response = next_response(&mut client).await;
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, lspkit_core::error::codes::REQUEST_CANCELLED);

        client
            .send(Notification::new(notifications::EXIT))
            .await
            .unwrap();
        let _ = pump.await.unwrap();
    }
}

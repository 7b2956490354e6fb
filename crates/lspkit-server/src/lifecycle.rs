//! The language server: handshake, gating, and the session lifecycle.
//!
//! [`LanguageServer`] owns the handler registry, the router, and the
//! session state machine. Inbound traffic flows through
//! [`LanguageServer::handle_request`] and
//! [`LanguageServer::handle_notification`], which enforce the protocol's
//! sequencing rules:
//!
//! - Before the handshake, only `initialize` is answered; every other
//!   request gets the not-initialized error and every notification except
//!   `exit` is dropped.
//! - The handshake completes when the client sends `initialized` (legacy
//!   clients that declare no capabilities complete it with the initialize
//!   response itself).
//! - Completing the handshake runs the registered startup hooks, flushes
//!   dynamic capability registrations, and fires the start signal that
//!   [`LanguageServer::started`] receivers replay.
//! - After `shutdown` is answered, only `exit` is expected; the recorded
//!   exit code is zero exactly when shutdown came first.

use async_trait::async_trait;
use futures::future::try_join_all;
use lspkit_core::capability::{InitializeParams, InitializeResult, ServerInfo};
use lspkit_core::error::{JsonRpcError, LspError, LspResult};
use lspkit_core::protocol::{methods, notifications, Notification, Request, Response};
use lspkit_core::session::SessionState;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::context::{CancellationToken, Peer, RequestContext};
use crate::handler::{
    ExtensionLanguageResolver, HandlerRegistration, LanguageIdResolver,
};
use crate::matcher::{DocumentSelectorMatcher, HandlerMatcher};
use crate::provider::ClientCapabilityProvider;
use crate::registration::RegistrationManager;
use crate::registry::{HandleId, HandlerCollection};
use crate::router::Router;

/// Hook run while handling the initialize request, before capabilities
/// are computed. A failure faults the handshake.
#[async_trait]
pub trait OnInitialize: Send + Sync {
    /// Inspect the client's initialize params.
    async fn on_initialize(&self, params: &InitializeParams, ctx: RequestContext)
    -> LspResult<()>;
}

/// Hook run when the handshake completes. A failure faults the session.
#[async_trait]
pub trait OnInitialized: Send + Sync {
    /// React to the completed handshake.
    async fn on_initialized(&self, ctx: RequestContext) -> LspResult<()>;
}

struct FnOnInitialize<F>(F);

#[async_trait]
impl<F, Fut> OnInitialize for FnOnInitialize<F>
where
    F: Fn(InitializeParams, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = LspResult<()>> + Send,
{
    async fn on_initialize(
        &self,
        params: &InitializeParams,
        ctx: RequestContext,
    ) -> LspResult<()> {
        (self.0)(params.clone(), ctx).await
    }
}

/// Wrap an async closure as an [`OnInitialize`] hook.
pub fn on_initialize_fn<F, Fut>(f: F) -> Arc<dyn OnInitialize>
where
    F: Fn(InitializeParams, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LspResult<()>> + Send + 'static,
{
    Arc::new(FnOnInitialize(f))
}

struct FnOnInitialized<F>(F);

#[async_trait]
impl<F, Fut> OnInitialized for FnOnInitialized<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = LspResult<()>> + Send,
{
    async fn on_initialized(&self, ctx: RequestContext) -> LspResult<()> {
        (self.0)(ctx).await
    }
}

/// Wrap an async closure as an [`OnInitialized`] hook.
pub fn on_initialized_fn<F, Fut>(f: F) -> Arc<dyn OnInitialized>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LspResult<()>> + Send + 'static,
{
    Arc::new(FnOnInitialized(f))
}

/// Outcome of the handshake, observed through [`LanguageServer::started`].
///
/// The signal settles exactly once: to [`Started`](Self::Started) when
/// every startup hook succeeded, or to [`Failed`](Self::Failed) when one
/// of them faulted the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StartSignal {
    /// The handshake has not reached an outcome yet.
    #[default]
    Pending,
    /// The session is up and serving feature requests.
    Started,
    /// A startup hook failed; the session never starts.
    Failed(String),
}

impl StartSignal {
    /// Whether the handshake reached an outcome.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the session started successfully.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

/// Builder for [`LanguageServer`].
pub struct LanguageServerBuilder {
    info: ServerInfo,
    registry: Arc<HandlerCollection>,
    matchers: Vec<Arc<dyn HandlerMatcher>>,
    resolver: Arc<dyn LanguageIdResolver>,
    on_initialize: Vec<Arc<dyn OnInitialize>>,
    on_initialized: Vec<Arc<dyn OnInitialized>>,
    work_done_progress: bool,
}

impl LanguageServerBuilder {
    /// Start building a server with the given identity.
    #[must_use]
    pub fn new(info: ServerInfo) -> Self {
        Self {
            info,
            registry: Arc::new(HandlerCollection::new()),
            matchers: vec![Arc::new(DocumentSelectorMatcher)],
            resolver: Arc::new(ExtensionLanguageResolver::new()),
            on_initialize: Vec::new(),
            on_initialized: Vec::new(),
            work_done_progress: false,
        }
    }

    /// Register a handler.
    #[must_use]
    pub fn handler(self, registration: HandlerRegistration) -> Self {
        self.registry.add(registration);
        self
    }

    /// Add a disambiguation matcher.
    ///
    /// Matchers are consulted in the order they were added, after the
    /// stock document-selector matcher; the first to select a candidate
    /// decides the route.
    #[must_use]
    pub fn matcher(mut self, matcher: Arc<dyn HandlerMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Enable server-side work-done progress reporting.
    ///
    /// Dynamic registrations whose options carry a progress flag advertise
    /// this setting on the wire.
    #[must_use]
    pub const fn work_done_progress(mut self, enabled: bool) -> Self {
        self.work_done_progress = enabled;
        self
    }

    /// Replace the language id resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn LanguageIdResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Add an initialize-phase hook.
    #[must_use]
    pub fn on_initialize(mut self, hook: Arc<dyn OnInitialize>) -> Self {
        self.on_initialize.push(hook);
        self
    }

    /// Add a handshake-completion hook.
    #[must_use]
    pub fn on_initialized(mut self, hook: Arc<dyn OnInitialized>) -> Self {
        self.on_initialized.push(hook);
        self
    }

    /// Build the server.
    #[must_use]
    pub fn build(self) -> Arc<LanguageServer> {
        let (started_tx, _) = watch::channel(StartSignal::Pending);
        Arc::new(LanguageServer {
            info: self.info,
            router: Router::new(
                Arc::clone(&self.registry),
                self.matchers,
                self.resolver,
            ),
            manager: RegistrationManager::new(
                Arc::clone(&self.registry),
                self.work_done_progress,
            ),
            registry: self.registry,
            provider: RwLock::new(None),
            state: RwLock::new(SessionState::Uninitialized),
            on_initialize: self.on_initialize,
            on_initialized: self.on_initialized,
            started_tx,
            exit_code: RwLock::new(None),
            peer: RwLock::new(Arc::new(crate::context::NoOpPeer)),
        })
    }
}

/// A running language server session.
pub struct LanguageServer {
    info: ServerInfo,
    registry: Arc<HandlerCollection>,
    router: Router,
    manager: RegistrationManager,
    provider: RwLock<Option<Arc<ClientCapabilityProvider>>>,
    state: RwLock<SessionState>,
    on_initialize: Vec<Arc<dyn OnInitialize>>,
    on_initialized: Vec<Arc<dyn OnInitialized>>,
    started_tx: watch::Sender<StartSignal>,
    exit_code: RwLock<Option<i32>>,
    peer: RwLock<Arc<dyn Peer>>,
}

impl LanguageServer {
    /// Start building a server.
    #[must_use]
    pub fn builder(info: ServerInfo) -> LanguageServerBuilder {
        LanguageServerBuilder::new(info)
    }

    /// The server's identity.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// The shared handler registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerCollection> {
        &self.registry
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The client capability digest, once initialize was handled.
    #[must_use]
    pub fn provider(&self) -> Option<Arc<ClientCapabilityProvider>> {
        self.provider
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// A receiver for the start signal.
    ///
    /// The signal settles once, when the handshake completes or faults;
    /// receivers obtained after that observe the settled signal
    /// immediately. Await it with `rx.wait_for(StartSignal::is_settled)`.
    #[must_use]
    pub fn started(&self) -> watch::Receiver<StartSignal> {
        self.started_tx.subscribe()
    }

    /// The recorded process exit code, set by the exit notification.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind the connection's peer to this server. Called by the runtime
    /// when the message pump starts.
    pub fn attach_peer(&self, peer: Arc<dyn Peer>) {
        *self.peer.write().unwrap_or_else(|e| e.into_inner()) = peer;
    }

    /// The connected peer, or a no-op peer before a runtime binds one.
    #[must_use]
    pub fn peer(&self) -> Arc<dyn Peer> {
        self.peer.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_state(&self, next: SessionState) -> LspResult<()> {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .transition(next)
    }

    /// Handle one inbound request, producing the response to send back.
    pub async fn handle_request(
        &self,
        request: Request,
        peer: Arc<dyn Peer>,
        cancellation: CancellationToken,
    ) -> Response {
        let id = request.id.clone();
        let result = match request.method() {
            methods::INITIALIZE => self.handle_initialize(&request, &peer).await,
            // shutdown is gated like any other request: before the
            // handshake it gets the not-initialized error
            methods::SHUTDOWN => self.gate_request().and_then(|()| self.handle_shutdown()),
            _ => self.handle_routed_request(&request, peer, cancellation).await,
        };
        match result {
            Ok(value) => Response::success(id, value),
            Err(err) => {
                debug!(method = request.method(), code = err.code(), %err, "request failed");
                Response::error(id, JsonRpcError::from(err))
            }
        }
    }

    async fn handle_routed_request(
        &self,
        request: &Request,
        peer: Arc<dyn Peer>,
        cancellation: CancellationToken,
    ) -> LspResult<Value> {
        self.gate_request()?;
        let entry = self.router.resolve(request.method(), request.params.as_ref())?;
        let ctx = RequestContext::for_request(peer, request.id.clone(), cancellation);
        let result = entry
            .registration
            .handler()
            .handle(request.params.clone(), ctx)
            .await?;
        Ok(result.unwrap_or(Value::Null))
    }

    /// Sequencing check for feature requests.
    fn gate_request(&self) -> LspResult<()> {
        match self.state() {
            SessionState::Initialized => Ok(()),
            SessionState::Uninitialized | SessionState::Initializing => {
                Err(LspError::ServerNotInitialized)
            }
            SessionState::ShuttingDown | SessionState::Exited => {
                Err(LspError::invalid_request("server is shutting down"))
            }
        }
    }

    async fn handle_initialize(
        &self,
        request: &Request,
        peer: &Arc<dyn Peer>,
    ) -> LspResult<Value> {
        self.set_state(SessionState::Initializing)?;

        let params: InitializeParams = match &request.params {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| LspError::invalid_params(methods::INITIALIZE, e.to_string()))?,
            None => InitializeParams::default(),
        };
        if let Some(client) = &params.client_info {
            info!(client = %client.name, version = ?client.version, "initialize received");
        }

        let ctx = RequestContext::for_notification(Arc::clone(peer));
        try_join_all(
            self.on_initialize
                .iter()
                .map(|hook| hook.on_initialize(&params, ctx.clone())),
        )
        .await
        .map_err(|e| LspError::handshake(e.to_string()))?;

        let provider = Arc::new(ClientCapabilityProvider::new(params.capabilities));
        let capabilities = provider.build_server_capabilities(&self.registry);
        let version = provider.version();
        *self.provider.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&provider));

        let result = InitializeResult {
            capabilities,
            server_info: Some(self.info.clone()),
        };

        // Legacy clients never send `initialized`; their handshake is
        // complete as soon as this response is produced.
        if !version.waits_for_initialized() {
            self.complete_handshake(peer).await?;
        }

        Ok(serde_json::to_value(&result)?)
    }

    fn handle_shutdown(&self) -> LspResult<Value> {
        self.set_state(SessionState::ShuttingDown)?;
        info!("shutdown requested");
        Ok(Value::Null)
    }

    /// Handle one inbound notification.
    ///
    /// Notification handler failures are logged, never surfaced to the
    /// client.
    pub async fn handle_notification(&self, notification: Notification, peer: Arc<dyn Peer>) {
        // owned copy: the params are moved into the handler below
        let method = notification.method().to_string();
        match method.as_str() {
            notifications::INITIALIZED => {
                if let Err(err) = self.complete_handshake(&peer).await {
                    error!(%err, "handshake failed");
                }
            }
            notifications::EXIT => self.handle_exit(),
            method => {
                if !self.state().accepts_requests() {
                    debug!(method, "notification before handshake completed, dropped");
                    return;
                }
                match self.router.resolve(method, notification.params.as_ref()) {
                    Ok(entry) => {
                        let ctx = RequestContext::for_notification(peer);
                        if let Err(err) = entry
                            .registration
                            .handler()
                            .handle(notification.params, ctx)
                            .await
                        {
                            warn!(method, %err, "notification handler failed");
                        }
                    }
                    Err(err) => {
                        // unroutable notifications are dropped by design of
                        // the protocol
                        debug!(method, %err, "notification dropped");
                    }
                }
            }
        }
    }

    /// Run the startup hooks, transition to `Initialized`, flush dynamic
    /// registrations, and settle the start signal.
    ///
    /// Any failure faults the session: the state never reaches
    /// `Initialized` past a failed hook, and the start signal settles to
    /// [`StartSignal::Failed`] so waiters observe the fault instead of
    /// hanging.
    async fn complete_handshake(&self, peer: &Arc<dyn Peer>) -> LspResult<()> {
        match self.try_complete_handshake(peer).await {
            Ok(()) => {
                info!(server = %self.info.name, "session started");
                let _ = self.started_tx.send(StartSignal::Started);
                Ok(())
            }
            Err(err) => {
                let _ = self.started_tx.send(StartSignal::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn try_complete_handshake(&self, peer: &Arc<dyn Peer>) -> LspResult<()> {
        // hooks first: the session only becomes Initialized once every
        // hook succeeded, so a fault keeps feature requests gated
        let ctx = RequestContext::for_notification(Arc::clone(peer));
        try_join_all(
            self.on_initialized
                .iter()
                .map(|hook| hook.on_initialized(ctx.clone())),
        )
        .await
        .map_err(|e| LspError::handshake(e.to_string()))?;

        // per-handler start hooks run together with the session hooks
        let entries = self.registry.snapshot();
        try_join_all(entries.iter().filter_map(|entry| {
            entry
                .registration
                .start_hook()
                .map(|hook| hook.on_started(ctx.clone()))
        }))
        .await
        .map_err(|e| LspError::handshake(e.to_string()))?;

        self.set_state(SessionState::Initialized)?;
        if let Some(provider) = self.provider() {
            self.manager.flush(peer, &provider).await?;
        }
        Ok(())
    }

    fn handle_exit(&self) {
        let code = self.state().exit_code();
        if let Err(err) = self.set_state(SessionState::Exited) {
            debug!(%err, "exit after exit, ignored");
            return;
        }
        info!(code, "exit received");
        *self.exit_code.write().unwrap_or_else(|e| e.into_inner()) = Some(code);
    }

    /// Add a handler after construction.
    ///
    /// Before the handshake this behaves like a builder registration. After
    /// the handshake the handler's start hook runs immediately and, when
    /// the client accepts its capability dynamically, the registration is
    /// announced right away.
    pub async fn add_handler(
        self: &Arc<Self>,
        registration: HandlerRegistration,
        peer: &Arc<dyn Peer>,
    ) -> LspResult<HandlerDisposable> {
        self.add_handlers(std::iter::once(registration), peer).await
    }

    /// Add several handlers after construction.
    ///
    /// One disposable covers every handle this call created; disposing it
    /// removes them all together. A registration whose identity already
    /// exists resolves to the existing handle, which stays owned by its
    /// original caller and is not covered by the returned disposable.
    pub async fn add_handlers(
        self: &Arc<Self>,
        registrations: impl IntoIterator<Item = HandlerRegistration>,
        peer: &Arc<dyn Peer>,
    ) -> LspResult<HandlerDisposable> {
        let mut handles = Vec::new();
        for registration in registrations {
            let (handle, created) = self.registry.add_entry(registration);
            if !created {
                continue;
            }
            handles.push(handle);
            if self.state() == SessionState::Initialized {
                if let Some(entry) = self.registry.get(handle) {
                    if let Some(hook) = entry.registration.start_hook() {
                        let ctx = RequestContext::for_notification(Arc::clone(peer));
                        hook.on_started(ctx)
                            .await
                            .map_err(|e| LspError::handshake(e.to_string()))?;
                    }
                }
                if let Some(provider) = self.provider() {
                    self.manager.register_entry(peer, &provider, handle).await?;
                }
            }
        }
        Ok(HandlerDisposable {
            server: Arc::downgrade(self),
            handles,
        })
    }

    /// Remove a handler and retract its dynamic registration, if any.
    pub async fn remove_handler(&self, handle: HandleId, peer: &Arc<dyn Peer>) -> LspResult<()> {
        let entry = self.registry.remove(handle)?;
        self.manager.unregister_entry(peer, &entry).await;
        Ok(())
    }
}

impl std::fmt::Debug for LanguageServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageServer")
            .field("info", &self.info)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Handle to dynamically added handlers; disposing it removes exactly
/// the handlers its call produced and retracts their registrations.
#[must_use = "dropping the disposable does not remove the handlers"]
pub struct HandlerDisposable {
    server: Weak<LanguageServer>,
    handles: Vec<HandleId>,
}

impl HandlerDisposable {
    /// The underlying registry handles, in registration order.
    #[must_use]
    pub fn handles(&self) -> &[HandleId] {
        &self.handles
    }

    /// Remove the handlers. No-op when the server is already gone.
    pub async fn dispose(self, peer: &Arc<dyn Peer>) -> LspResult<()> {
        let Some(server) = self.server.upgrade() else {
            return Ok(());
        };
        for handle in self.handles {
            server.remove_handler(handle, peer).await?;
        }
        Ok(())
    }
}

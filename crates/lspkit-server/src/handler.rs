//! Handler traits and declarative handler registration.
//!
//! A handler is the unit of server behavior: one async function bound to
//! one protocol method, optionally scoped to a document selector and tied
//! to a capability category. Registrations are built declaratively with
//! [`HandlerRegistration`]; nothing is discovered by inspecting handler
//! types at runtime.
//!
//! # Example
//!
//! ```rust
//! use lspkit_server::handler::{handler_fn, HandlerRegistration};
//! use lspkit_core::capability::CapabilityKind;
//! use lspkit_core::registration::TextDocumentRegistrationOptions;
//! use lspkit_core::selector::DocumentSelector;
//!
//! let registration = HandlerRegistration::request(
//!     "textDocument/hover",
//!     handler_fn(|_params, _ctx| async { Ok(Some(serde_json::json!(null))) }),
//! )
//! .capability(CapabilityKind::Hover)
//! .options(TextDocumentRegistrationOptions::for_selector(
//!     DocumentSelector::for_language("rust"),
//! ));
//! assert_eq!(registration.descriptor().method(), "textDocument/hover");
//! ```

use async_trait::async_trait;
use lspkit_core::capability::CapabilityKind;
use lspkit_core::error::LspResult;
use lspkit_core::registration::RegistrationOptions;
use lspkit_core::selector::DocumentSelector;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use url::Url;

use crate::context::RequestContext;

/// An async protocol handler.
///
/// Request handlers return `Some(result)`; notification handlers return
/// `Ok(None)`. Errors become JSON-RPC error responses for requests and are
/// logged for notifications.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one inbound message.
    async fn handle(&self, params: Option<Value>, ctx: RequestContext)
    -> LspResult<Option<Value>>;
}

/// Hook run when the session starts, or immediately for handlers added
/// after the session already started.
#[async_trait]
pub trait StartHook: Send + Sync {
    /// Run the hook. A failure faults the handshake.
    async fn on_started(&self, ctx: RequestContext) -> LspResult<()>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = LspResult<Option<Value>>> + Send,
{
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: RequestContext,
    ) -> LspResult<Option<Value>> {
        (self.0)(params, ctx).await
    }
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LspResult<Option<Value>>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnStartHook<F>(F);

#[async_trait]
impl<F, Fut> StartHook for FnStartHook<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = LspResult<()>> + Send,
{
    async fn on_started(&self, ctx: RequestContext) -> LspResult<()> {
        (self.0)(ctx).await
    }
}

/// Wrap an async closure as a [`StartHook`].
pub fn start_hook_fn<F, Fut>(f: F) -> Arc<dyn StartHook>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LspResult<()>> + Send + 'static,
{
    Arc::new(FnStartHook(f))
}

/// Whether a handler answers requests or consumes notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerType {
    /// Request handler; produces a response.
    Request,
    /// Notification handler; produces no response.
    Notification,
}

/// Everything the framework knows about a registered handler, minus the
/// handler itself.
#[derive(Clone)]
pub struct HandlerDescriptor {
    method: Cow<'static, str>,
    handler_type: HandlerType,
    options: Option<Arc<dyn RegistrationOptions>>,
    capability: Option<CapabilityKind>,
    implicit: bool,
    serial: bool,
}

impl HandlerDescriptor {
    /// The protocol method this handler answers.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request or notification.
    #[must_use]
    pub const fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// The registration options, if any were declared.
    #[must_use]
    pub fn options(&self) -> Option<&Arc<dyn RegistrationOptions>> {
        self.options.as_ref()
    }

    /// Typed access to the declared options.
    #[must_use]
    pub fn options_as<T: 'static>(&self) -> Option<&T> {
        self.options
            .as_ref()
            .and_then(|options| options.as_any().downcast_ref::<T>())
    }

    /// The document selector declared in the options, if any.
    #[must_use]
    pub fn document_selector(&self) -> Option<&DocumentSelector> {
        self.options
            .as_ref()
            .and_then(|options| options.document_selector())
    }

    /// The capability category this handler contributes to.
    #[must_use]
    pub const fn capability(&self) -> Option<CapabilityKind> {
        self.capability
    }

    /// Whether this handler is registered implicitly through another
    /// feature's registration (resolve handlers) and never on its own.
    #[must_use]
    pub const fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Whether this handler must see messages in arrival order.
    #[must_use]
    pub const fn is_serial(&self) -> bool {
        self.serial
    }

    /// Identity key for idempotent registration: the method plus the
    /// serialized options. Two registrations with the same key are the
    /// same registration. serde_json orders object keys, so the key is
    /// canonical.
    #[must_use]
    pub fn identity(&self) -> String {
        let mut key = self.method.to_string();
        if let Some(options) = &self.options {
            if let Ok(value) = options.to_value() {
                key.push('#');
                key.push_str(&value.to_string());
            }
        }
        key
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("method", &self.method)
            .field("handler_type", &self.handler_type)
            .field("capability", &self.capability)
            .field("implicit", &self.implicit)
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

/// A handler plus its descriptor, ready to add to the registry.
#[derive(Clone)]
pub struct HandlerRegistration {
    descriptor: HandlerDescriptor,
    handler: Arc<dyn Handler>,
    start_hook: Option<Arc<dyn StartHook>>,
}

impl HandlerRegistration {
    /// A request handler for `method`.
    pub fn request(method: impl Into<Cow<'static, str>>, handler: Arc<dyn Handler>) -> Self {
        Self::new(method, HandlerType::Request, handler)
    }

    /// A notification handler for `method`.
    pub fn notification(method: impl Into<Cow<'static, str>>, handler: Arc<dyn Handler>) -> Self {
        Self::new(method, HandlerType::Notification, handler)
    }

    fn new(
        method: impl Into<Cow<'static, str>>,
        handler_type: HandlerType,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            descriptor: HandlerDescriptor {
                method: method.into(),
                handler_type,
                options: None,
                capability: None,
                implicit: false,
                serial: false,
            },
            handler,
            start_hook: None,
        }
    }

    /// Attach registration options (selector, trigger characters, ...).
    #[must_use]
    pub fn options(mut self, options: impl RegistrationOptions + 'static) -> Self {
        self.descriptor.options = Some(Arc::new(options));
        self
    }

    /// Tie this handler to a capability category for negotiation.
    #[must_use]
    pub fn capability(mut self, kind: CapabilityKind) -> Self {
        self.descriptor.capability = Some(kind);
        self
    }

    /// Mark this handler as implicitly registered through another feature
    /// (resolve handlers).
    #[must_use]
    pub fn implicit(mut self) -> Self {
        self.descriptor.implicit = true;
        self
    }

    /// Require arrival-order processing for this handler's messages.
    /// Document sync notifications set this.
    #[must_use]
    pub fn serial(mut self) -> Self {
        self.descriptor.serial = true;
        self
    }

    /// Attach a hook to run when the session starts.
    #[must_use]
    pub fn on_started(mut self, hook: Arc<dyn StartHook>) -> Self {
        self.start_hook = Some(hook);
        self
    }

    /// The descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// The start hook, if one was attached.
    #[must_use]
    pub fn start_hook(&self) -> Option<&Arc<dyn StartHook>> {
        self.start_hook.as_ref()
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Resolves the language id of a document whose URI is all we have.
///
/// Open documents carry their language id in the didOpen notification;
/// requests for documents the server never saw opened fall back to this.
pub trait LanguageIdResolver: Send + Sync {
    /// The language id for `uri`, when it can be determined.
    fn resolve(&self, uri: &Url) -> Option<String>;
}

/// File-extension based language resolution with a conventional default
/// table.
#[derive(Debug, Clone)]
pub struct ExtensionLanguageResolver {
    map: HashMap<String, String>,
}

impl ExtensionLanguageResolver {
    /// A resolver with the conventional extension table.
    #[must_use]
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for (ext, lang) in [
            ("rs", "rust"),
            ("js", "javascript"),
            ("ts", "typescript"),
            ("py", "python"),
            ("go", "go"),
            ("c", "c"),
            ("h", "c"),
            ("cpp", "cpp"),
            ("json", "json"),
            ("toml", "toml"),
            ("yaml", "yaml"),
            ("yml", "yaml"),
            ("md", "markdown"),
            ("html", "html"),
            ("css", "css"),
        ] {
            map.insert(ext.to_string(), lang.to_string());
        }
        Self { map }
    }

    /// Add or override an extension mapping.
    #[must_use]
    pub fn with_extension(mut self, ext: impl Into<String>, language: impl Into<String>) -> Self {
        self.map.insert(ext.into(), language.into());
        self
    }
}

impl Default for ExtensionLanguageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageIdResolver for ExtensionLanguageResolver {
    fn resolve(&self, uri: &Url) -> Option<String> {
        let path = uri.path();
        let ext = path.rsplit('.').next()?;
        // A path without a dot yields itself from rsplit.
        if ext.len() == path.len() {
            return None;
        }
        self.map.get(ext).cloned()
    }
}

//! # lspkit-server
//!
//! Server runtime for the lspkit language server framework.
//!
//! This crate builds the running server on top of `lspkit-core`'s types:
//!
//! - **Handler registry**: an arena of method handlers addressed by opaque
//!   handles
//! - **Routing**: method dispatch with document-selector disambiguation
//! - **Capability negotiation**: the static server capability answer,
//!   synthesized from the registry against the client's declarations
//! - **Lifecycle**: the initialize/initialized handshake, request gating,
//!   shutdown/exit sequencing, and the replayable start signal
//! - **Dynamic registration**: `client/registerCapability` planning,
//!   flushing, and best-effort retraction
//! - **Runtime**: the message pump binding a server to a transport
//!
//! # Example
//!
//! ```rust
//! use lspkit_server::{LanguageServer, handler::{HandlerRegistration, handler_fn}};
//! use lspkit_core::capability::ServerInfo;
//!
//! let server = LanguageServer::builder(ServerInfo::new("my-server", "0.1.0"))
//!     .handler(HandlerRegistration::request(
//!         "textDocument/hover",
//!         handler_fn(|_params, _ctx| async { Ok(Some(serde_json::json!(null))) }),
//!     ))
//!     .build();
//! assert_eq!(server.info().name, "my-server");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod handler;
pub mod lifecycle;
pub mod matcher;
pub mod provider;
pub mod registration;
pub mod registry;
pub mod router;
pub mod runtime;

// Re-export commonly used types at the crate root
pub use context::{CancellationToken, NoOpPeer, Peer, RequestContext};
pub use handler::{
    ExtensionLanguageResolver, Handler, HandlerDescriptor, HandlerRegistration, HandlerType,
    LanguageIdResolver, StartHook, handler_fn, start_hook_fn,
};
pub use lifecycle::{
    HandlerDisposable, LanguageServer, LanguageServerBuilder, OnInitialize, OnInitialized,
    StartSignal, on_initialize_fn, on_initialized_fn,
};
pub use matcher::{DocumentSelectorMatcher, HandlerMatcher};
pub use provider::ClientCapabilityProvider;
pub use registration::RegistrationManager;
pub use registry::{HandleId, HandlerCollection, HandlerEntry};
pub use router::Router;
pub use runtime::{ClientHandle, MemoryTransport, ServerRuntime, Transport};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use lspkit_server::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::{CancellationToken, NoOpPeer, Peer, RequestContext};
    pub use crate::handler::{
        ExtensionLanguageResolver, Handler, HandlerDescriptor, HandlerRegistration, HandlerType,
        LanguageIdResolver, StartHook, handler_fn, start_hook_fn,
    };
    pub use crate::lifecycle::{
        HandlerDisposable, LanguageServer, LanguageServerBuilder, OnInitialize, OnInitialized,
        StartSignal, on_initialize_fn, on_initialized_fn,
    };
    pub use crate::matcher::{DocumentSelectorMatcher, HandlerMatcher};
    pub use crate::provider::ClientCapabilityProvider;
    pub use crate::registration::RegistrationManager;
    pub use crate::registry::{HandleId, HandlerCollection, HandlerEntry};
    pub use crate::router::Router;
    pub use crate::runtime::{
        ClientHandle, MemoryTransport, MessageReader, MessageWriter, ServerRuntime, Transport,
    };
}

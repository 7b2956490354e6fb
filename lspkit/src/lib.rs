//! # lspkit - Language Server Framework for Rust
//!
//! A framework for building language servers that speak the editor
//! protocol: bidirectional JSON-RPC, capability negotiation, and a
//! handler registry with dynamic registration.
//!
//! ## Features
//!
//! - **Declarative handlers** registered once and routed by method and
//!   document selector
//! - **Capability negotiation** synthesized from the registry against the
//!   client's declared support
//! - **Dynamic registration** with automatic batching and retraction
//! - **Lifecycle management** covering the full initialize/initialized
//!   handshake, request gating, and shutdown/exit sequencing
//! - **Transport-agnostic runtime** with an in-memory transport for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use lspkit::prelude::*;
//! use serde_json::json;
//!
//! let server = LanguageServer::builder(ServerInfo::new("my-server", "1.0.0"))
//!     .handler(
//!         HandlerRegistration::request(
//!             "textDocument/hover",
//!             handler_fn(|_params, _ctx| async {
//!                 Ok(Some(json!({ "contents": "Hello" })))
//!             }),
//!         )
//!         .capability(CapabilityKind::Hover),
//!     )
//!     .build();
//! assert_eq!(server.info().name, "my-server");
//! ```
//!
//! Bind the server to a transport with [`ServerRuntime::run`], which pumps
//! messages until the client disconnects or sends `exit`.
//!
//! ## Crate Organization
//!
//! - [`lspkit_core`] - Protocol types, capabilities, and selectors (no
//!   async runtime)
//! - [`mod@lspkit_server`] - Server runtime with registry, router, and
//!   lifecycle management

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use lspkit_core::*;

// Re-export server types
pub use lspkit_server::{
    CancellationToken, ClientCapabilityProvider, ClientHandle, DocumentSelectorMatcher, HandleId,
    Handler, HandlerCollection, HandlerDescriptor, HandlerDisposable, HandlerEntry, HandlerMatcher,
    HandlerRegistration, HandlerType, LanguageServer, LanguageServerBuilder, MemoryTransport,
    NoOpPeer, OnInitialize, OnInitialized, Peer, RegistrationManager, RequestContext, Router,
    ServerRuntime, StartHook, StartSignal, Transport, handler_fn, on_initialize_fn,
    on_initialized_fn, start_hook_fn,
};

pub mod prelude;

/// Server module re-exports
pub mod server {
    //! Server runtime types.
    pub use lspkit_server::*;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        // Just verify the prelude compiles
        use crate::prelude::*;
        let _ = std::any::type_name::<LspError>();
    }
}

//! Prelude module for convenient imports.
//!
//! Import everything you need with a single use statement:
//!
//! ```rust
//! use lspkit::prelude::*;
//!
//! // Now you have access to all common types
//! let info = ServerInfo::new("my-server", "1.0.0");
//! let selector = DocumentSelector::for_language("rust");
//! ```
//!
//! This module re-exports the most commonly used types from the framework,
//! making it easy to get started without having to import individual items.
//!
//! ## Included Types
//!
//! ### Core Types
//! - Protocol types (Request, Response, Notification, Message)
//! - Error types (`LspError`, `JsonRpcError`)
//! - Capability types (`ServerCapabilities`, `ClientCapabilities`,
//!   `CapabilityKind`)
//! - Selector types (`DocumentSelector`, `DocumentFilter`)
//!
//! ### Server Types
//! - Handler traits and constructors (`Handler`, `handler_fn`,
//!   `HandlerRegistration`)
//! - `LanguageServer` and `LanguageServerBuilder`
//! - `ServerRuntime` and `Transport`
//! - `RequestContext`, `Peer`, and `CancellationToken`

// Core types
pub use lspkit_core::prelude::*;

// Server types
pub use lspkit_server::{
    CancellationToken, ClientHandle, HandleId, Handler, HandlerDisposable, HandlerRegistration,
    HandlerType, LanguageServer, LanguageServerBuilder, MemoryTransport, NoOpPeer, OnInitialize,
    OnInitialized, Peer, RequestContext, ServerRuntime, StartHook, StartSignal, Transport,
    handler_fn, on_initialize_fn, on_initialized_fn, start_hook_fn,
};

//! # lspkit-core
//!
//! Core types for the lspkit language server framework.
//!
//! This crate provides the foundational building blocks:
//!
//! - **Protocol types**: JSON-RPC 2.0 request/response/notification types
//!   with the editor protocol's method names
//! - **Capability negotiation**: client capability trees, the capability
//!   category table, and the synthesized server capability set
//! - **Document selectors**: language/scheme/pattern filters used to route
//!   a document to the right handler
//! - **Dynamic registration**: `client/registerCapability` wire types and
//!   the method-specific options shapes
//! - **Session lifecycle**: the initialize/shutdown/exit state machine
//! - **Error handling**: unified `LspError` type with rich diagnostics
//!
//! This crate is runtime-agnostic and does not depend on any async runtime.
//! The `lspkit-server` crate builds the handler registry, router, and
//! lifecycle orchestration on top of it.
//!
//! # Example
//!
//! ```rust
//! use lspkit_core::{
//!     capability::{ClientCapabilities, CapabilityKind, CapabilityTable},
//!     selector::{DocumentAttributes, DocumentSelector},
//! };
//! use url::Url;
//!
//! let table = CapabilityTable::from_client(&ClientCapabilities::default());
//! assert!(!table.supports_dynamic(CapabilityKind::Hover));
//!
//! let selector = DocumentSelector::for_language("rust");
//! let doc = DocumentAttributes::new(
//!     Url::parse("file:///src/lib.rs").unwrap(),
//!     Some("rust".to_string()),
//! );
//! assert!(selector.matches(&doc));
//! ```
//!
//! # Feature Flags
//!
//! - `fancy-errors`: enable miette's fancy terminal error reporting.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod protocol;
pub mod registration;
pub mod selector;
pub mod session;

// Re-export commonly used types at the crate root
pub use capability::{
    CapabilityKind, CapabilityStatus, CapabilityTable, ClientCapabilities, ClientInfo,
    InitializeParams, InitializeResult, ProtocolVersion, ServerCapabilities, ServerInfo,
    Supports, TextDocumentSyncKind, KNOWN_CAPABILITIES,
};
pub use error::{JsonRpcError, LspError, LspResult};
pub use protocol::{Message, Notification, Request, RequestId, Response, JSONRPC_VERSION};
pub use registration::{
    Registration, RegistrationOptions, RegistrationParams, Unregistration, UnregistrationParams,
};
pub use selector::{DocumentAttributes, DocumentFilter, DocumentSelector, ANY_LANGUAGE};
pub use session::SessionState;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use lspkit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::{
        CapabilityKind, CapabilityStatus, CapabilityTable, ClientCapabilities, ClientInfo,
        CompletionOptions, ExecuteCommandOptions, InitializeParams, InitializeResult,
        ProtocolVersion, SaveOptions, ServerCapabilities, ServerInfo, SignatureHelpOptions,
        Supports, TextDocumentSyncKind, TextDocumentSyncOptions, KNOWN_CAPABILITIES,
    };
    pub use crate::error::{JsonRpcError, LspError, LspResult};
    pub use crate::protocol::{
        methods, notifications, Message, Notification, Request, RequestId, Response,
        JSONRPC_VERSION,
    };
    pub use crate::registration::{
        CompletionRegistrationOptions, ExecuteCommandRegistrationOptions, Registration,
        RegistrationOptions, RegistrationParams, TextDocumentChangeRegistrationOptions,
        TextDocumentRegistrationOptions, TextDocumentSaveRegistrationOptions, Unregistration,
        UnregistrationParams,
    };
    pub use crate::selector::{
        DocumentAttributes, DocumentFilter, DocumentSelector, ANY_LANGUAGE,
    };
    pub use crate::session::SessionState;
}

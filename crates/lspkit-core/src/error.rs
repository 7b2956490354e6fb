//! Unified error handling for the lspkit framework.
//!
//! A single, context-rich error type flows through the whole core, in the
//! spirit of keeping `Result<T, LspError>` small and easy to convert into a
//! JSON-RPC error response.
//!
//! The taxonomy mirrors how errors propagate:
//!
//! - Protocol-sequencing errors (`ServerNotInitialized`, `InvalidState`) are
//!   surfaced to the remote peer as structured RPC errors, never panics.
//! - Routing misses (`MethodNotFound`) become RPC errors for requests and are
//!   silently dropped for notifications.
//! - Handshake hook failures (`HandshakeFailed`) are fatal to the session.
//! - Transport failures during best-effort registration bookkeeping are
//!   swallowed by the caller after logging.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the framework.
pub type LspResult<T> = Result<T, LspError>;

/// JSON-RPC error codes used by the editor protocol.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is unavailable.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// A request arrived before the initialize handshake completed.
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    /// The request was cancelled by the client.
    pub const REQUEST_CANCELLED: i32 = -32800;
    /// The server cancelled the request for its own reasons.
    pub const REQUEST_FAILED: i32 = -32803;
}

/// The unified error type for the framework core.
#[derive(Debug, Error, Diagnostic)]
pub enum LspError {
    /// A request other than `initialize` arrived before the handshake
    /// completed.
    #[error("server not initialized")]
    #[diagnostic(code(lspkit::not_initialized))]
    ServerNotInitialized,

    /// No handler is registered for the inbound method.
    #[error("method not found: {method}")]
    #[diagnostic(code(lspkit::method_not_found))]
    MethodNotFound {
        /// The method that could not be routed.
        method: String,
    },

    /// The request parameters were missing or malformed.
    #[error("invalid params for {method}: {message}")]
    #[diagnostic(code(lspkit::invalid_params))]
    InvalidParams {
        /// The method whose parameters were rejected.
        method: String,
        /// What was wrong with them.
        message: String,
    },

    /// The request was cancelled before the handler finished.
    #[error("request cancelled")]
    #[diagnostic(code(lspkit::cancelled))]
    RequestCancelled,

    /// The request is not acceptable in the current session phase.
    #[error("{message}")]
    #[diagnostic(code(lspkit::invalid_request))]
    InvalidRequest {
        /// Why the request was refused.
        message: String,
    },

    /// A session state transition was attempted out of order.
    #[error("invalid session transition: {from} -> {to}")]
    #[diagnostic(code(lspkit::invalid_state))]
    InvalidState {
        /// The state the session was in.
        from: &'static str,
        /// The state the caller tried to reach.
        to: &'static str,
    },

    /// An `on initialize` / `on initialized` hook failed; the whole
    /// handshake is faulted and the session never starts.
    #[error("handshake failed: {message}")]
    #[diagnostic(code(lspkit::handshake))]
    HandshakeFailed {
        /// Hook failure description.
        message: String,
    },

    /// The underlying byte stream failed or closed unexpectedly.
    #[error("transport error: {message}")]
    #[diagnostic(code(lspkit::transport))]
    Transport {
        /// Transport failure description.
        message: String,
    },

    /// A wire payload failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    #[diagnostic(code(lspkit::serde))]
    Serialization(#[from] serde_json::Error),

    /// The remote peer answered one of our requests with an error.
    #[error("peer returned error {code}: {message}")]
    #[diagnostic(code(lspkit::peer))]
    Peer {
        /// JSON-RPC error code from the peer.
        code: i32,
        /// Error message from the peer.
        message: String,
    },

    /// Unexpected internal condition.
    #[error("internal error: {message}")]
    #[diagnostic(code(lspkit::internal))]
    Internal {
        /// Failure description.
        message: String,
    },
}

impl LspError {
    /// Create a method-not-found error.
    #[must_use]
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid-params error.
    #[must_use]
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a handshake-failure error.
    #[must_use]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            message: message.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The JSON-RPC error code this error maps to on the wire.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::ServerNotInitialized => codes::SERVER_NOT_INITIALIZED,
            Self::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => codes::INVALID_PARAMS,
            Self::RequestCancelled => codes::REQUEST_CANCELLED,
            Self::InvalidRequest { .. } | Self::InvalidState { .. } => codes::INVALID_REQUEST,
            Self::HandshakeFailed { .. } => codes::REQUEST_FAILED,
            // round-trips the code the peer (or the gate) chose
            Self::Peer { code, .. } => *code,
            Self::Transport { .. } | Self::Serialization(_) | Self::Internal { .. } => {
                codes::INTERNAL_ERROR
            }
        }
    }
}

/// A JSON-RPC 2.0 error object as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct JsonRpcError {
    /// The error code.
    pub code: i32,
    /// A short description of the error.
    pub message: String,
    /// Additional error data, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<LspError> for JsonRpcError {
    fn from(err: LspError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }
}

impl From<JsonRpcError> for LspError {
    fn from(err: JsonRpcError) -> Self {
        match err.code {
            codes::SERVER_NOT_INITIALIZED => Self::ServerNotInitialized,
            codes::METHOD_NOT_FOUND => Self::MethodNotFound {
                method: err.message,
            },
            codes::INVALID_REQUEST => Self::InvalidRequest {
                message: err.message,
            },
            codes::REQUEST_CANCELLED => Self::RequestCancelled,
            code => Self::Peer {
                code,
                message: err.message,
            },
        }
    }
}

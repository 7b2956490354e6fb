//! Request context and the peer connection seam.
//!
//! Every handler invocation receives a [`RequestContext`] carrying the
//! cancellation token for that request and a handle to the remote peer.
//! The [`Peer`] trait is the only way framework code talks back to the
//! client, which keeps the registry and router testable without a live
//! connection.

use async_trait::async_trait;
use lspkit_core::error::{LspError, LspResult};
use lspkit_core::protocol::RequestId;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The remote side of the connection, as seen by handlers and the
/// framework.
///
/// `request` performs a full round-trip: the returned value is the peer's
/// `result`, and a peer-side error surfaces as [`LspError::Peer`].
#[async_trait]
pub trait Peer: Send + Sync {
    /// Send a notification to the peer.
    async fn notify(&self, method: &str, params: Option<Value>) -> LspResult<()>;

    /// Send a request to the peer and wait for its response.
    async fn request(&self, method: &str, params: Option<Value>) -> LspResult<Value>;
}

/// A peer that accepts everything and answers with null.
///
/// Used in tests and for sessions that have not connected yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPeer;

#[async_trait]
impl Peer for NoOpPeer {
    async fn notify(&self, _method: &str, _params: Option<Value>) -> LspResult<()> {
        Ok(())
    }

    async fn request(&self, _method: &str, _params: Option<Value>) -> LspResult<Value> {
        Ok(Value::Null)
    }
}

/// Cooperative cancellation flag shared between the runtime and a running
/// handler.
///
/// Cancellation is advisory: a handler that never checks the token simply
/// runs to completion, and its response is still delivered.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-invocation context handed to every handler.
#[derive(Clone)]
pub struct RequestContext {
    peer: Arc<dyn Peer>,
    cancellation: CancellationToken,
    request_id: Option<RequestId>,
}

impl RequestContext {
    /// Context for a request, with its id and cancellation token.
    #[must_use]
    pub fn for_request(
        peer: Arc<dyn Peer>,
        request_id: RequestId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            peer,
            cancellation,
            request_id: Some(request_id),
        }
    }

    /// Context for a notification; notifications cannot be cancelled and
    /// have no id.
    #[must_use]
    pub fn for_notification(peer: Arc<dyn Peer>) -> Self {
        Self {
            peer,
            cancellation: CancellationToken::new(),
            request_id: None,
        }
    }

    /// Context detached from any connection, for tests and hooks.
    #[must_use]
    pub fn detached() -> Self {
        Self::for_notification(Arc::new(NoOpPeer))
    }

    /// The remote peer.
    #[must_use]
    pub fn peer(&self) -> &Arc<dyn Peer> {
        &self.peer
    }

    /// The id of the request being handled, when handling a request.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// This invocation's cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the client cancelled this request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Bail out with [`LspError::RequestCancelled`] if cancellation was
    /// requested. Long-running handlers call this between work items.
    pub fn check_cancelled(&self) -> LspResult<()> {
        if self.is_cancelled() {
            Err(LspError::RequestCancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_flows_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_check_cancelled() {
        let ctx = RequestContext::for_request(
            Arc::new(NoOpPeer),
            RequestId::from(1),
            CancellationToken::new(),
        );
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancellation().cancel();
        assert!(matches!(
            ctx.check_cancelled(),
            Err(LspError::RequestCancelled)
        ));
    }

    #[test]
    fn test_notification_context_has_no_id() {
        let ctx = RequestContext::detached();
        assert!(ctx.request_id().is_none());
    }

    #[tokio::test]
    async fn test_noop_peer_answers_null() {
        let peer = NoOpPeer;
        let value = peer.request("workspace/configuration", None).await.unwrap();
        assert_eq!(value, Value::Null);
    }
}

//! The handler registry.
//!
//! Handlers live in an arena keyed by opaque [`HandleId`]s. Adding a
//! registration returns its handle; removal takes the handle back. The
//! arena never compares handlers for equality, so the same closure can be
//! registered twice under different selectors and each copy removed
//! independently.
//!
//! Adding a registration whose identity (method plus declared options) is
//! already present is idempotent: the existing handle is returned and
//! nothing changes.

use lspkit_core::error::{LspError, LspResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::handler::{HandlerRegistration, HandlerType};

/// Opaque handle to one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// One arena slot: the registration plus registry bookkeeping.
#[derive(Clone)]
pub struct HandlerEntry {
    /// The handle this entry lives under.
    pub id: HandleId,
    /// The registration as built by the caller.
    pub registration: HandlerRegistration,
    /// The wire id of the dynamic registration covering this handler, once
    /// one was flushed to the client.
    pub dynamic_id: Option<String>,
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("method", &self.registration.descriptor().method())
            .field("dynamic_id", &self.dynamic_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: HashMap<HandleId, HandlerEntry>,
    // insertion-ordered handles per method
    by_method: HashMap<String, Vec<HandleId>>,
    by_identity: HashMap<String, HandleId>,
}

/// Arena of all handlers known to the server, static and dynamic alike.
///
/// Interior-mutable: the server shares one collection across the router,
/// the capability provider, and the registration manager.
#[derive(Default)]
pub struct HandlerCollection {
    inner: RwLock<Inner>,
}

impl HandlerCollection {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration, returning its handle.
    ///
    /// Idempotent on identity: a registration whose method and options
    /// match an existing entry returns the existing handle.
    pub fn add(&self, registration: HandlerRegistration) -> HandleId {
        self.add_entry(registration).0
    }

    /// Add a registration, reporting whether a new entry was created.
    ///
    /// Callers that scope removal to the handles their own call produced
    /// (disposables) must skip handles resolved through the idempotence
    /// path.
    pub fn add_entry(&self, registration: HandlerRegistration) -> (HandleId, bool) {
        let identity = registration.descriptor().identity();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(&existing) = inner.by_identity.get(&identity) {
            return (existing, false);
        }
        let id = HandleId(inner.next_id);
        inner.next_id += 1;
        inner
            .by_method
            .entry(registration.descriptor().method().to_string())
            .or_default()
            .push(id);
        inner.by_identity.insert(identity, id);
        inner.entries.insert(
            id,
            HandlerEntry {
                id,
                registration,
                dynamic_id: None,
            },
        );
        (id, true)
    }

    /// Remove the handler behind `id`, returning its entry.
    pub fn remove(&self, id: HandleId) -> LspResult<HandlerEntry> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let entry = inner
            .entries
            .remove(&id)
            .ok_or_else(|| LspError::internal(format!("no handler for {id}")))?;
        let method = entry.registration.descriptor().method().to_string();
        if let Some(handles) = inner.by_method.get_mut(&method) {
            handles.retain(|&h| h != id);
            if handles.is_empty() {
                inner.by_method.remove(&method);
            }
        }
        let identity = entry.registration.descriptor().identity();
        inner.by_identity.remove(&identity);
        Ok(entry)
    }

    /// Record the wire id of the dynamic registration covering `id`.
    pub fn set_dynamic_id(&self, id: HandleId, dynamic_id: String) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.dynamic_id = Some(dynamic_id);
        }
    }

    /// The entry behind `id`, if it is still registered.
    #[must_use]
    pub fn get(&self, id: HandleId) -> Option<HandlerEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.get(&id).cloned()
    }

    /// Whether any handler answers `method`.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_method.contains_key(method)
    }

    /// All entries for `method`, in registration order.
    #[must_use]
    pub fn entries_for(&self, method: &str) -> Vec<HandlerEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .by_method
            .get(method)
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(|id| inner.entries.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every entry, in handle order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HandlerEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<HandlerEntry> = inner.entries.values().cloned().collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    /// How many handlers are registered.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any notification handler for `method` requires arrival-order
    /// processing.
    #[must_use]
    pub fn is_serial_method(&self, method: &str) -> bool {
        self.entries_for(method)
            .iter()
            .any(|entry| entry.registration.descriptor().is_serial())
    }
}

impl fmt::Debug for HandlerCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCollection")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// convenience, avoids importing HandlerType at call sites
impl HandlerCollection {
    /// Whether any request handler answers `method`.
    #[must_use]
    pub fn has_request_handler(&self, method: &str) -> bool {
        self.entries_for(method)
            .iter()
            .any(|entry| entry.registration.descriptor().handler_type() == HandlerType::Request)
    }
}

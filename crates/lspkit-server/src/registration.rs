//! Dynamic registration bookkeeping.
//!
//! After the handshake, every handler tied to a capability the client
//! accepts dynamically is announced with `client/registerCapability`. The
//! manager plans the batch, flushes it as a single request, and records
//! each registration's wire id against its handle so removal can
//! unregister precisely.
//!
//! Wire ids are freshly generated UUIDs, one per registration event; an
//! id is never reused, even when the same handler is unregistered and
//! registered again.
//!
//! Unregistration is best-effort: the handler is already gone from the
//! registry when the wire message goes out, so a transport failure only
//! leaves the client with a stale registration it will drop at session
//! end. Those failures are logged and swallowed.

use lspkit_core::error::LspResult;
use lspkit_core::protocol::methods;
use lspkit_core::registration::{
    Registration, RegistrationParams, Unregistration, UnregistrationParams,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::Peer;
use crate::handler::HandlerDescriptor;
use crate::provider::ClientCapabilityProvider;
use crate::registry::{HandleId, HandlerCollection, HandlerEntry};

/// A planned wire registration for one handler.
#[derive(Debug, Clone)]
pub struct PlannedRegistration {
    /// The handle the registration covers.
    pub handle: HandleId,
    /// The wire payload.
    pub registration: Registration,
}

/// Plans and flushes dynamic capability registrations.
pub struct RegistrationManager {
    registry: Arc<HandlerCollection>,
    // server-level progress setting, stamped into outgoing options
    work_done_progress: bool,
}

impl RegistrationManager {
    /// A manager over the shared registry.
    #[must_use]
    pub fn new(registry: Arc<HandlerCollection>, work_done_progress: bool) -> Self {
        Self {
            registry,
            work_done_progress,
        }
    }

    /// Whether `entry` should be registered dynamically: it has a
    /// capability the client accepts dynamically, is not an implicit
    /// (resolve) handler, and is not already registered.
    fn wants_registration(provider: &ClientCapabilityProvider, entry: &HandlerEntry) -> bool {
        if entry.dynamic_id.is_some() || entry.registration.descriptor().is_implicit() {
            return false;
        }
        entry
            .registration
            .descriptor()
            .capability()
            .is_some_and(|kind| provider.prefers_dynamic(kind))
    }

    /// Plan the registrations currently owed to the client.
    pub fn plan(&self, provider: &ClientCapabilityProvider) -> LspResult<Vec<PlannedRegistration>> {
        let mut planned = Vec::new();
        for entry in self.registry.snapshot() {
            if !Self::wants_registration(provider, &entry) {
                continue;
            }
            planned.push(self.plan_entry(&entry)?);
        }
        Ok(planned)
    }

    fn plan_entry(&self, entry: &HandlerEntry) -> LspResult<PlannedRegistration> {
        let descriptor = entry.registration.descriptor();
        Ok(PlannedRegistration {
            handle: entry.id,
            registration: Registration {
                // a fresh id per registration event, never reused
                id: Uuid::new_v4().to_string(),
                method: descriptor.method().to_string(),
                register_options: self.wire_options(descriptor)?,
            },
        })
    }

    /// Serialize the descriptor's options for the wire. Options that carry
    /// the progress field get the server's current progress setting, not
    /// whatever the handler declared.
    fn wire_options(&self, descriptor: &HandlerDescriptor) -> LspResult<Option<Value>> {
        let Some(options) = descriptor.options() else {
            return Ok(None);
        };
        let mut value = options.to_value()?;
        if options.supports_work_done_progress() {
            if let Value::Object(map) = &mut value {
                map.insert(
                    "workDoneProgress".to_string(),
                    Value::Bool(self.work_done_progress),
                );
            }
        }
        Ok(Some(value))
    }

    /// Flush every owed registration in one `client/registerCapability`
    /// request and record the resulting wire ids.
    ///
    /// A failure leaves no id recorded, so the next flush retries the
    /// whole batch.
    pub async fn flush(
        &self,
        peer: &Arc<dyn Peer>,
        provider: &ClientCapabilityProvider,
    ) -> LspResult<()> {
        let planned = self.plan(provider)?;
        if planned.is_empty() {
            return Ok(());
        }
        debug!(count = planned.len(), "registering dynamic capabilities");
        let params = RegistrationParams {
            registrations: planned
                .iter()
                .map(|p| p.registration.clone())
                .collect(),
        };
        peer.request(
            methods::CLIENT_REGISTER_CAPABILITY,
            Some(serde_json::to_value(&params)?),
        )
        .await?;
        for p in planned {
            self.registry.set_dynamic_id(p.handle, p.registration.id);
        }
        Ok(())
    }

    /// Register one late-added handler, if the client accepts its
    /// capability dynamically. No-op otherwise.
    pub async fn register_entry(
        &self,
        peer: &Arc<dyn Peer>,
        provider: &ClientCapabilityProvider,
        handle: HandleId,
    ) -> LspResult<()> {
        let Some(entry) = self.registry.get(handle) else {
            return Ok(());
        };
        if !Self::wants_registration(provider, &entry) {
            return Ok(());
        }
        let planned = self.plan_entry(&entry)?;
        let params = RegistrationParams {
            registrations: vec![planned.registration.clone()],
        };
        peer.request(
            methods::CLIENT_REGISTER_CAPABILITY,
            Some(serde_json::to_value(&params)?),
        )
        .await?;
        self.registry
            .set_dynamic_id(planned.handle, planned.registration.id);
        Ok(())
    }

    /// Retract the dynamic registration covering a removed handler.
    ///
    /// Best-effort: failures are logged and swallowed.
    pub async fn unregister_entry(&self, peer: &Arc<dyn Peer>, entry: &HandlerEntry) {
        let Some(dynamic_id) = entry.dynamic_id.clone() else {
            return;
        };
        let method = entry.registration.descriptor().method().to_string();
        let params = UnregistrationParams {
            unregisterations: vec![Unregistration {
                id: dynamic_id,
                method: method.clone(),
            }],
        };
        let params = match serde_json::to_value(&params) {
            Ok(value) => value,
            Err(err) => {
                warn!(method, %err, "failed to serialize unregistration");
                return;
            }
        };
        if let Err(err) = peer
            .request(methods::CLIENT_UNREGISTER_CAPABILITY, Some(params))
            .await
        {
            warn!(method, %err, "capability unregistration failed");
        }
    }
}

impl std::fmt::Debug for RegistrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationManager")
            .field("registry", &self.registry)
            .finish()
    }
}

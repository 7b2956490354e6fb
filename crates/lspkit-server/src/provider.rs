//! Capability negotiation against the live handler registry.
//!
//! [`ClientCapabilityProvider`] is built once, from the initialize
//! request, and answers two questions for the rest of the session: what
//! did the client declare, and what should the server advertise. A
//! feature is advertised statically only when every method the feature
//! requires has a handler *and* the client did not offer dynamic
//! registration for it; features the client accepts dynamically are left
//! out of the static answer and registered after the handshake instead.
//!
//! Derived fields (resolve providers, the aggregate sync kind, the
//! execute-command union) are computed against the registry at call time,
//! so a handler added just before initialize is reflected in the static
//! answer.

use lspkit_core::capability::{
    CapabilityKind, CapabilityTable, ClientCapabilities, CompletionOptions, ExecuteCommandOptions,
    ProtocolVersion, ResolveProviderOptions, SaveOptions, ServerCapabilities,
    SignatureHelpOptions, TextDocumentSyncKind, TextDocumentSyncOptions,
};
use lspkit_core::registration::{
    CompletionRegistrationOptions, ExecuteCommandRegistrationOptions,
    SignatureHelpRegistrationOptions, TextDocumentChangeRegistrationOptions,
    TextDocumentSaveRegistrationOptions,
};

use crate::registry::{HandlerCollection, HandlerEntry};

/// The client's declared capabilities, digested for the session.
#[derive(Debug, Clone)]
pub struct ClientCapabilityProvider {
    capabilities: ClientCapabilities,
    table: CapabilityTable,
    version: ProtocolVersion,
}

impl ClientCapabilityProvider {
    /// Digest the capability tree from the initialize request.
    #[must_use]
    pub fn new(capabilities: ClientCapabilities) -> Self {
        let table = CapabilityTable::from_client(&capabilities);
        let version = ProtocolVersion::from_capabilities(&capabilities);
        Self {
            capabilities,
            table,
            version,
        }
    }

    /// The raw capability tree, as the client sent it.
    #[must_use]
    pub const fn client(&self) -> &ClientCapabilities {
        &self.capabilities
    }

    /// The per-category digest.
    #[must_use]
    pub const fn table(&self) -> &CapabilityTable {
        &self.table
    }

    /// The protocol generation implied by the capability tree.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Whether `kind` should be registered dynamically after the
    /// handshake rather than advertised statically.
    #[must_use]
    pub fn prefers_dynamic(&self, kind: CapabilityKind) -> bool {
        self.table.supports_dynamic(kind)
    }

    /// Whether `kind` belongs in the static initialize answer: every
    /// required method has a handler and the client did not offer dynamic
    /// registration.
    #[must_use]
    pub fn has_static_handler(&self, kind: CapabilityKind, registry: &HandlerCollection) -> bool {
        !self.prefers_dynamic(kind)
            && kind
                .methods()
                .iter()
                .all(|method| registry.has_method(method))
    }

    /// Synthesize the server capability tree for the initialize result.
    #[must_use]
    pub fn build_server_capabilities(&self, registry: &HandlerCollection) -> ServerCapabilities {
        let mut caps = ServerCapabilities::default();
        let ready = |kind| self.has_static_handler(kind, registry);

        if ready(CapabilityKind::TextSync) {
            caps.text_document_sync = Some(self.sync_options(registry));
        }
        if ready(CapabilityKind::Hover) {
            caps.hover_provider = Some(true);
        }
        if ready(CapabilityKind::Completion) {
            caps.completion_provider = Some(self.completion_options(registry));
        }
        if ready(CapabilityKind::SignatureHelp) {
            caps.signature_help_provider = Some(Self::signature_help_options(registry));
        }
        if ready(CapabilityKind::Declaration) {
            caps.declaration_provider = Some(true);
        }
        if ready(CapabilityKind::Definition) {
            caps.definition_provider = Some(true);
        }
        if ready(CapabilityKind::TypeDefinition) {
            caps.type_definition_provider = Some(true);
        }
        if ready(CapabilityKind::Implementation) {
            caps.implementation_provider = Some(true);
        }
        if ready(CapabilityKind::References) {
            caps.references_provider = Some(true);
        }
        if ready(CapabilityKind::DocumentHighlight) {
            caps.document_highlight_provider = Some(true);
        }
        if ready(CapabilityKind::DocumentSymbol) {
            caps.document_symbol_provider = Some(true);
        }
        if ready(CapabilityKind::CodeAction) {
            caps.code_action_provider = Some(true);
        }
        if ready(CapabilityKind::CodeLens) {
            caps.code_lens_provider = Some(ResolveProviderOptions {
                resolve_provider: Self::resolve_flag(registry, CapabilityKind::CodeLens),
            });
        }
        if ready(CapabilityKind::DocumentLink) {
            caps.document_link_provider = Some(ResolveProviderOptions {
                resolve_provider: Self::resolve_flag(registry, CapabilityKind::DocumentLink),
            });
        }
        if ready(CapabilityKind::Color) {
            caps.color_provider = Some(true);
        }
        if ready(CapabilityKind::Formatting) {
            caps.document_formatting_provider = Some(true);
        }
        if ready(CapabilityKind::RangeFormatting) {
            caps.document_range_formatting_provider = Some(true);
        }
        if ready(CapabilityKind::Rename) {
            caps.rename_provider = Some(true);
        }
        if ready(CapabilityKind::FoldingRange) {
            caps.folding_range_provider = Some(true);
        }
        if ready(CapabilityKind::SelectionRange) {
            caps.selection_range_provider = Some(true);
        }
        if ready(CapabilityKind::WorkspaceSymbol) {
            caps.workspace_symbol_provider = Some(true);
        }
        if ready(CapabilityKind::ExecuteCommand) {
            caps.execute_command_provider = Some(Self::execute_command_options(registry));
        }
        // OnTypeFormatting needs a declared trigger character and
        // SemanticTokens a legend; without typed options neither can be
        // synthesized, so both stay dynamic-only.
        caps
    }

    /// Aggregate the sync advertisement across every didChange handler.
    ///
    /// Handlers that never declared a sync kind count as `Full`.
    fn sync_options(&self, registry: &HandlerCollection) -> TextDocumentSyncOptions {
        let change_entries = registry.entries_for("textDocument/didChange");
        let change = TextDocumentSyncKind::merge(change_entries.iter().map(|entry| {
            entry
                .registration
                .descriptor()
                .options_as::<TextDocumentChangeRegistrationOptions>()
                .map_or(TextDocumentSyncKind::Full, |options| options.sync_kind)
        }));

        let save = if registry.has_method("textDocument/didSave") {
            let include_text = first_options::<TextDocumentSaveRegistrationOptions>(
                &registry.entries_for("textDocument/didSave"),
            )
            .and_then(|options| options.include_text);
            Some(SaveOptions { include_text })
        } else {
            None
        };

        TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(change),
            will_save: registry.has_method("textDocument/willSave").then_some(true),
            save,
        }
    }

    fn completion_options(&self, registry: &HandlerCollection) -> CompletionOptions {
        let entries = registry.entries_for("textDocument/completion");
        let trigger_characters = union_strings(&entries, |entry| {
            entry
                .registration
                .descriptor()
                .options_as::<CompletionRegistrationOptions>()
                .and_then(|options| options.trigger_characters.clone())
        });
        let declared = entries.iter().any(|entry| {
            entry
                .registration
                .descriptor()
                .options_as::<CompletionRegistrationOptions>()
                .and_then(|options| options.resolve_provider)
                .unwrap_or(false)
        });
        let resolve = declared || Self::resolve_registered(registry, CapabilityKind::Completion);
        CompletionOptions {
            resolve_provider: resolve.then_some(true),
            trigger_characters,
            work_done_progress: None,
        }
    }

    fn signature_help_options(registry: &HandlerCollection) -> SignatureHelpOptions {
        let entries = registry.entries_for("textDocument/signatureHelp");
        SignatureHelpOptions {
            trigger_characters: union_strings(&entries, |entry| {
                entry
                    .registration
                    .descriptor()
                    .options_as::<SignatureHelpRegistrationOptions>()
                    .and_then(|options| options.trigger_characters.clone())
            }),
            retrigger_characters: None,
        }
    }

    /// Union of commands across every execute-command handler.
    fn execute_command_options(registry: &HandlerCollection) -> ExecuteCommandOptions {
        let entries = registry.entries_for("workspace/executeCommand");
        let commands = union_strings(&entries, |entry| {
            entry
                .registration
                .descriptor()
                .options_as::<ExecuteCommandRegistrationOptions>()
                .map(|options| options.commands.clone())
        })
        .unwrap_or_default();
        ExecuteCommandOptions { commands }
    }

    /// Whether `kind`'s resolve method has a live handler.
    ///
    /// Derived at call time so a resolve handler added after the feature
    /// handler still flips the flag.
    fn resolve_registered(registry: &HandlerCollection, kind: CapabilityKind) -> bool {
        kind.resolve_method()
            .is_some_and(|method| registry.has_method(method))
    }

    fn resolve_flag(registry: &HandlerCollection, kind: CapabilityKind) -> Option<bool> {
        Self::resolve_registered(registry, kind).then_some(true)
    }
}

/// First typed options among `entries`, in registration order.
#[must_use]
pub fn first_options<T: 'static>(entries: &[HandlerEntry]) -> Option<&T> {
    entries
        .iter()
        .find_map(|entry| entry.registration.descriptor().options_as::<T>())
}

/// Order-preserving deduplicated union of per-entry string lists.
fn union_strings(
    entries: &[HandlerEntry],
    per_entry: impl Fn(&HandlerEntry) -> Option<Vec<String>>,
) -> Option<Vec<String>> {
    let mut seen = Vec::new();
    for entry in entries {
        if let Some(values) = per_entry(entry) {
            for value in values {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
        }
    }
    if seen.is_empty() { None } else { Some(seen) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerRegistration, handler_fn};
    use lspkit_core::capability::{
        ClientCapabilities, DynamicClientCapability, TextDocumentClientCapabilities,
    };
    use lspkit_core::selector::DocumentSelector;
    use pretty_assertions::assert_eq;

    fn notification(method: &'static str) -> HandlerRegistration {
        HandlerRegistration::notification(method, handler_fn(|_, _| async { Ok(None) }))
    }

    fn request(method: &'static str) -> HandlerRegistration {
        HandlerRegistration::request(method, handler_fn(|_, _| async { Ok(None) }))
    }

    fn sync_registry(kinds: &[TextDocumentSyncKind]) -> HandlerCollection {
        let registry = HandlerCollection::new();
        registry.add(notification("textDocument/didOpen"));
        registry.add(notification("textDocument/didClose"));
        for (i, &kind) in kinds.iter().enumerate() {
            registry.add(
                notification("textDocument/didChange").options(
                    TextDocumentChangeRegistrationOptions::new(
                        DocumentSelector::for_language(format!("lang{i}")),
                        kind,
                    ),
                ),
            );
        }
        registry
    }

    #[test]
    fn test_static_feature_requires_all_methods() {
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());
        let registry = HandlerCollection::new();
        registry.add(notification("textDocument/didOpen"));
        registry.add(notification("textDocument/didChange"));
        // didClose missing
        assert!(!provider.has_static_handler(CapabilityKind::TextSync, &registry));

        registry.add(notification("textDocument/didClose"));
        assert!(provider.has_static_handler(CapabilityKind::TextSync, &registry));
    }

    #[test]
    fn test_dynamic_preference_suppresses_static_advertisement() {
        let caps = ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                hover: Some(DynamicClientCapability::dynamic()),
                ..TextDocumentClientCapabilities::default()
            }),
            ..ClientCapabilities::default()
        };
        let provider = ClientCapabilityProvider::new(caps);
        let registry = HandlerCollection::new();
        registry.add(request("textDocument/hover"));

        assert!(provider.prefers_dynamic(CapabilityKind::Hover));
        let server_caps = provider.build_server_capabilities(&registry);
        assert_eq!(server_caps.hover_provider, None);
    }

    #[test]
    fn test_sync_kind_aggregation() {
        use TextDocumentSyncKind::{Full, Incremental};
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());

        let registry = sync_registry(&[Full, Incremental, Incremental]);
        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(
            caps.text_document_sync.unwrap().change,
            Some(Incremental)
        );

        let registry = sync_registry(&[Full, Full]);
        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(caps.text_document_sync.unwrap().change, Some(Full));
    }

    #[test]
    fn test_untyped_change_handler_counts_as_full() {
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());
        let registry = HandlerCollection::new();
        registry.add(notification("textDocument/didOpen"));
        registry.add(notification("textDocument/didChange"));
        registry.add(notification("textDocument/didClose"));
        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(
            caps.text_document_sync.unwrap().change,
            Some(TextDocumentSyncKind::Full)
        );
    }

    #[test]
    fn test_completion_resolve_derived_from_registry() {
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());
        let registry = HandlerCollection::new();
        registry.add(request("textDocument/completion"));

        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(caps.completion_provider.unwrap().resolve_provider, None);

        registry.add(request("completionItem/resolve").implicit());
        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(
            caps.completion_provider.unwrap().resolve_provider,
            Some(true)
        );
    }

    #[test]
    fn test_execute_command_union() {
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());
        let registry = HandlerCollection::new();
        registry.add(
            request("workspace/executeCommand")
                .options(ExecuteCommandRegistrationOptions::new(["a", "b"])),
        );
        registry.add(
            HandlerRegistration::request(
                "workspace/executeCommand",
                handler_fn(|_, _| async { Ok(None) }),
            )
            .options(ExecuteCommandRegistrationOptions::new(["b", "c"])),
        );

        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(
            caps.execute_command_provider.unwrap().commands,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_completion_trigger_character_union() {
        let provider = ClientCapabilityProvider::new(ClientCapabilities::default());
        let registry = HandlerCollection::new();
        registry.add(
            request("textDocument/completion").options(CompletionRegistrationOptions {
                document_selector: Some(DocumentSelector::for_language("rust")),
                trigger_characters: Some(vec![".".to_string(), "::".to_string()]),
                ..CompletionRegistrationOptions::default()
            }),
        );
        registry.add(
            request("textDocument/completion").options(CompletionRegistrationOptions {
                document_selector: Some(DocumentSelector::for_language("toml")),
                trigger_characters: Some(vec![".".to_string(), "[".to_string()]),
                ..CompletionRegistrationOptions::default()
            }),
        );

        let caps = provider.build_server_capabilities(&registry);
        assert_eq!(
            caps.completion_provider.unwrap().trigger_characters,
            Some(vec![".".to_string(), "::".to_string(), "[".to_string()])
        );
    }
}

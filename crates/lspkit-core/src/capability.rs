//! Capability types for the editor protocol handshake.
//!
//! Capabilities are negotiated once, during the initialize handshake. The
//! client reports which features it understands (and whether it accepts
//! dynamic registration for each); the server answers with the feature set
//! it actually has handlers for.
//!
//! The known categories are an explicit table rather than anything
//! reflective: [`CapabilityKind`] enumerates every category, and each kind
//! knows how to read its slot out of [`ClientCapabilities`] and which
//! protocol methods a static advertisement requires.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// A client-declared feature-support flag.
///
/// `Supports<T>` distinguishes "the client never mentioned this feature"
/// from "the client mentioned it, with this value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Supports<T> {
    /// Whether the client declared the capability at all.
    pub supported: bool,
    /// The declared value, when present.
    pub value: Option<T>,
}

impl<T> Supports<T> {
    /// A declared capability with a value.
    #[must_use]
    pub fn supported(value: T) -> Self {
        Self {
            supported: true,
            value: Some(value),
        }
    }

    /// An absent capability.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            value: None,
        }
    }

    /// Whether the capability was declared.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.supported
    }
}

impl<T> From<Option<T>> for Supports<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::supported(v),
            None => Self::unsupported(),
        }
    }
}

/// The common shape of a per-feature client capability.
///
/// Every feature slot carries at least a `dynamicRegistration` flag; any
/// feature-specific extras are kept verbatim for handlers that care.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicClientCapability {
    /// Whether the client accepts dynamic registration for this feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_registration: Option<bool>,
    /// Feature-specific fields, preserved as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DynamicClientCapability {
    /// A capability that accepts dynamic registration.
    #[must_use]
    pub fn dynamic() -> Self {
        Self {
            dynamic_registration: Some(true),
            extra: serde_json::Map::new(),
        }
    }

    /// A capability without dynamic registration.
    #[must_use]
    pub fn static_only() -> Self {
        Self {
            dynamic_registration: Some(false),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether dynamic registration was declared.
    #[must_use]
    pub fn supports_dynamic_registration(&self) -> bool {
        self.dynamic_registration.unwrap_or(false)
    }
}

/// Text-document capabilities declared by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentClientCapabilities {
    /// Document synchronization (open/change/save/close).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synchronization: Option<DynamicClientCapability>,
    /// Completion support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<DynamicClientCapability>,
    /// Hover support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<DynamicClientCapability>,
    /// Signature help support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_help: Option<DynamicClientCapability>,
    /// Go-to-declaration support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<DynamicClientCapability>,
    /// Go-to-definition support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<DynamicClientCapability>,
    /// Go-to-type-definition support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<DynamicClientCapability>,
    /// Go-to-implementation support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<DynamicClientCapability>,
    /// Find-references support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<DynamicClientCapability>,
    /// Document highlight support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_highlight: Option<DynamicClientCapability>,
    /// Document symbol support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_symbol: Option<DynamicClientCapability>,
    /// Code action support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_action: Option<DynamicClientCapability>,
    /// Code lens support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_lens: Option<DynamicClientCapability>,
    /// Document link support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_link: Option<DynamicClientCapability>,
    /// Color provider support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_provider: Option<DynamicClientCapability>,
    /// Whole-document formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting: Option<DynamicClientCapability>,
    /// Range formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_formatting: Option<DynamicClientCapability>,
    /// On-type formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_type_formatting: Option<DynamicClientCapability>,
    /// Rename support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<DynamicClientCapability>,
    /// Folding range support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folding_range: Option<DynamicClientCapability>,
    /// Selection range support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_range: Option<DynamicClientCapability>,
    /// Semantic tokens support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_tokens: Option<DynamicClientCapability>,
}

/// Workspace capabilities declared by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceClientCapabilities {
    /// Workspace symbol support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<DynamicClientCapability>,
    /// Execute-command support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_command: Option<DynamicClientCapability>,
    /// Watched-file change notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_change_watched_files: Option<DynamicClientCapability>,
    /// Whether the client supports workspace folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_folders: Option<bool>,
    /// Whether the client supports `workspace/configuration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<bool>,
}

/// The full client capability tree, stored verbatim for the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// Workspace capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceClientCapabilities>,
    /// Text-document capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_document: Option<TextDocumentClientCapabilities>,
    /// Experimental capabilities, preserved as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

/// Every capability category this framework negotiates.
///
/// Each kind maps to exactly one slot of the client capability tree and to
/// the set of protocol methods a static advertisement requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// Text document synchronization (open/change/close).
    TextSync,
    /// `textDocument/completion`.
    Completion,
    /// `textDocument/hover`.
    Hover,
    /// `textDocument/signatureHelp`.
    SignatureHelp,
    /// `textDocument/declaration`.
    Declaration,
    /// `textDocument/definition`.
    Definition,
    /// `textDocument/typeDefinition`.
    TypeDefinition,
    /// `textDocument/implementation`.
    Implementation,
    /// `textDocument/references`.
    References,
    /// `textDocument/documentHighlight`.
    DocumentHighlight,
    /// `textDocument/documentSymbol`.
    DocumentSymbol,
    /// `textDocument/codeAction`.
    CodeAction,
    /// `textDocument/codeLens`.
    CodeLens,
    /// `textDocument/documentLink`.
    DocumentLink,
    /// `textDocument/documentColor`.
    Color,
    /// `textDocument/formatting`.
    Formatting,
    /// `textDocument/rangeFormatting`.
    RangeFormatting,
    /// `textDocument/onTypeFormatting`.
    OnTypeFormatting,
    /// `textDocument/rename`.
    Rename,
    /// `textDocument/foldingRange`.
    FoldingRange,
    /// `textDocument/selectionRange`.
    SelectionRange,
    /// `textDocument/semanticTokens/*`.
    SemanticTokens,
    /// `workspace/symbol`.
    WorkspaceSymbol,
    /// `workspace/executeCommand`.
    ExecuteCommand,
    /// `workspace/didChangeWatchedFiles`.
    WatchedFiles,
}

/// All kinds, in the order server capabilities are synthesized.
pub const KNOWN_CAPABILITIES: &[CapabilityKind] = &[
    CapabilityKind::TextSync,
    CapabilityKind::Completion,
    CapabilityKind::Hover,
    CapabilityKind::SignatureHelp,
    CapabilityKind::Declaration,
    CapabilityKind::Definition,
    CapabilityKind::TypeDefinition,
    CapabilityKind::Implementation,
    CapabilityKind::References,
    CapabilityKind::DocumentHighlight,
    CapabilityKind::DocumentSymbol,
    CapabilityKind::CodeAction,
    CapabilityKind::CodeLens,
    CapabilityKind::DocumentLink,
    CapabilityKind::Color,
    CapabilityKind::Formatting,
    CapabilityKind::RangeFormatting,
    CapabilityKind::OnTypeFormatting,
    CapabilityKind::Rename,
    CapabilityKind::FoldingRange,
    CapabilityKind::SelectionRange,
    CapabilityKind::SemanticTokens,
    CapabilityKind::WorkspaceSymbol,
    CapabilityKind::ExecuteCommand,
    CapabilityKind::WatchedFiles,
];

impl CapabilityKind {
    /// The protocol methods that must all have a registered handler before
    /// this feature may be advertised statically.
    #[must_use]
    pub const fn methods(self) -> &'static [&'static str] {
        match self {
            Self::TextSync => &[
                "textDocument/didOpen",
                "textDocument/didChange",
                "textDocument/didClose",
            ],
            Self::Completion => &["textDocument/completion"],
            Self::Hover => &["textDocument/hover"],
            Self::SignatureHelp => &["textDocument/signatureHelp"],
            Self::Declaration => &["textDocument/declaration"],
            Self::Definition => &["textDocument/definition"],
            Self::TypeDefinition => &["textDocument/typeDefinition"],
            Self::Implementation => &["textDocument/implementation"],
            Self::References => &["textDocument/references"],
            Self::DocumentHighlight => &["textDocument/documentHighlight"],
            Self::DocumentSymbol => &["textDocument/documentSymbol"],
            Self::CodeAction => &["textDocument/codeAction"],
            Self::CodeLens => &["textDocument/codeLens"],
            Self::DocumentLink => &["textDocument/documentLink"],
            Self::Color => &["textDocument/documentColor"],
            Self::Formatting => &["textDocument/formatting"],
            Self::RangeFormatting => &["textDocument/rangeFormatting"],
            Self::OnTypeFormatting => &["textDocument/onTypeFormatting"],
            Self::Rename => &["textDocument/rename"],
            Self::FoldingRange => &["textDocument/foldingRange"],
            Self::SelectionRange => &["textDocument/selectionRange"],
            Self::SemanticTokens => &["textDocument/semanticTokens/full"],
            Self::WorkspaceSymbol => &["workspace/symbol"],
            Self::ExecuteCommand => &["workspace/executeCommand"],
            Self::WatchedFiles => &["workspace/didChangeWatchedFiles"],
        }
    }

    /// The follow-up resolve method implied by this feature's registration,
    /// if it has one. Resolve handlers never register on their own.
    #[must_use]
    pub const fn resolve_method(self) -> Option<&'static str> {
        match self {
            Self::Completion => Some("completionItem/resolve"),
            Self::CodeAction => Some("codeAction/resolve"),
            Self::CodeLens => Some("codeLens/resolve"),
            Self::DocumentLink => Some("documentLink/resolve"),
            _ => None,
        }
    }

    /// Read this kind's slot out of the client capability tree.
    #[must_use]
    pub fn client_slot(self, caps: &ClientCapabilities) -> Option<&DynamicClientCapability> {
        let td = caps.text_document.as_ref();
        let ws = caps.workspace.as_ref();
        match self {
            Self::TextSync => td.and_then(|t| t.synchronization.as_ref()),
            Self::Completion => td.and_then(|t| t.completion.as_ref()),
            Self::Hover => td.and_then(|t| t.hover.as_ref()),
            Self::SignatureHelp => td.and_then(|t| t.signature_help.as_ref()),
            Self::Declaration => td.and_then(|t| t.declaration.as_ref()),
            Self::Definition => td.and_then(|t| t.definition.as_ref()),
            Self::TypeDefinition => td.and_then(|t| t.type_definition.as_ref()),
            Self::Implementation => td.and_then(|t| t.implementation.as_ref()),
            Self::References => td.and_then(|t| t.references.as_ref()),
            Self::DocumentHighlight => td.and_then(|t| t.document_highlight.as_ref()),
            Self::DocumentSymbol => td.and_then(|t| t.document_symbol.as_ref()),
            Self::CodeAction => td.and_then(|t| t.code_action.as_ref()),
            Self::CodeLens => td.and_then(|t| t.code_lens.as_ref()),
            Self::DocumentLink => td.and_then(|t| t.document_link.as_ref()),
            Self::Color => td.and_then(|t| t.color_provider.as_ref()),
            Self::Formatting => td.and_then(|t| t.formatting.as_ref()),
            Self::RangeFormatting => td.and_then(|t| t.range_formatting.as_ref()),
            Self::OnTypeFormatting => td.and_then(|t| t.on_type_formatting.as_ref()),
            Self::Rename => td.and_then(|t| t.rename.as_ref()),
            Self::FoldingRange => td.and_then(|t| t.folding_range.as_ref()),
            Self::SelectionRange => td.and_then(|t| t.selection_range.as_ref()),
            Self::SemanticTokens => td.and_then(|t| t.semantic_tokens.as_ref()),
            Self::WorkspaceSymbol => ws.and_then(|w| w.symbol.as_ref()),
            Self::ExecuteCommand => ws.and_then(|w| w.execute_command.as_ref()),
            Self::WatchedFiles => ws.and_then(|w| w.did_change_watched_files.as_ref()),
        }
    }
}

/// What the client declared for one capability category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityStatus {
    /// Whether the client declared the category at all.
    pub supported: bool,
    /// Whether the client accepts dynamic registration for it.
    pub dynamic_registration: bool,
    /// The declared value, kept verbatim.
    pub value: Option<DynamicClientCapability>,
}

/// Per-category record of what the client reported during initialize.
///
/// Populated exactly once, while handling the initialize request, and only
/// read afterwards.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    entries: HashMap<CapabilityKind, CapabilityStatus>,
}

impl CapabilityTable {
    /// Build the table from the client's declared capabilities.
    #[must_use]
    pub fn from_client(caps: &ClientCapabilities) -> Self {
        let mut entries = HashMap::with_capacity(KNOWN_CAPABILITIES.len());
        for &kind in KNOWN_CAPABILITIES {
            let status = match kind.client_slot(caps) {
                Some(declared) => CapabilityStatus {
                    supported: true,
                    dynamic_registration: declared.supports_dynamic_registration(),
                    value: Some(declared.clone()),
                },
                None => CapabilityStatus::default(),
            };
            entries.insert(kind, status);
        }
        Self { entries }
    }

    /// What the client declared for a category.
    #[must_use]
    pub fn status(&self, kind: CapabilityKind) -> &CapabilityStatus {
        // from_client inserts every known kind
        self.entries.get(&kind).unwrap_or(EMPTY_STATUS)
    }

    /// Whether the client declared the category.
    #[must_use]
    pub fn supports(&self, kind: CapabilityKind) -> bool {
        self.status(kind).supported
    }

    /// Whether the client accepts dynamic registration for the category.
    #[must_use]
    pub fn supports_dynamic(&self, kind: CapabilityKind) -> bool {
        let status = self.status(kind);
        status.supported && status.dynamic_registration
    }
}

static EMPTY_STATUS: &CapabilityStatus = &CapabilityStatus {
    supported: false,
    dynamic_registration: false,
    value: None,
};

/// Protocol generation implied by the shape of the client capabilities.
///
/// Legacy (2.x) clients send an empty capability tree and complete the
/// handshake as soon as the initialize result is sent; current (3.x)
/// clients additionally send the `initialized` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Legacy protocol: no capability tree, no `initialized` notification.
    Lsp2,
    /// Current protocol.
    Lsp3,
}

impl ProtocolVersion {
    /// Derive the protocol generation from the declared capabilities.
    #[must_use]
    pub fn from_capabilities(caps: &ClientCapabilities) -> Self {
        if caps.text_document.is_some() || caps.workspace.is_some() {
            Self::Lsp3
        } else {
            Self::Lsp2
        }
    }

    /// Whether the handshake waits for the `initialized` notification.
    #[must_use]
    pub const fn waits_for_initialized(self) -> bool {
        matches!(self, Self::Lsp3)
    }
}

// ---------------------------------------------------------------------------
// Server capabilities
// ---------------------------------------------------------------------------

/// How text document changes are synced to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TextDocumentSyncKind {
    /// Documents are not synced at all.
    None,
    /// The full document content is sent on every change.
    #[default]
    Full,
    /// Only incremental edits are sent.
    Incremental,
}

impl TextDocumentSyncKind {
    /// Merge the sync kinds declared by several change handlers into the
    /// single kind the server advertises.
    ///
    /// The finest-grained kind any handler can accept wins: any
    /// `Incremental` handler means `Incremental`; otherwise `Full`; `None`
    /// only when no other kind is present.
    #[must_use]
    pub fn merge(kinds: impl IntoIterator<Item = Self>) -> Self {
        let mut saw_full = false;
        for kind in kinds {
            match kind {
                Self::Incremental => return Self::Incremental,
                Self::Full => saw_full = true,
                Self::None => {}
            }
        }
        if saw_full { Self::Full } else { Self::None }
    }
}

impl From<TextDocumentSyncKind> for u8 {
    fn from(kind: TextDocumentSyncKind) -> Self {
        match kind {
            TextDocumentSyncKind::None => 0,
            TextDocumentSyncKind::Full => 1,
            TextDocumentSyncKind::Incremental => 2,
        }
    }
}

impl TryFrom<u8> for TextDocumentSyncKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Full),
            2 => Ok(Self::Incremental),
            other => Err(format!("invalid text document sync kind: {other}")),
        }
    }
}

/// Save notification options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Whether the client should include the document text on save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_text: Option<bool>,
}

/// Aggregated text-document-sync advertisement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentSyncOptions {
    /// Whether open/close notifications are wanted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_close: Option<bool>,
    /// The change sync kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<TextDocumentSyncKind>,
    /// Whether will-save notifications are wanted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub will_save: Option<bool>,
    /// Save notification options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOptions>,
}

/// Completion feature options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Whether the server resolves additional completion item detail lazily.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_provider: Option<bool>,
    /// Characters that trigger completion automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_characters: Option<Vec<String>>,
    /// Whether the server reports work-done progress for completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

/// Signature help feature options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpOptions {
    /// Characters that trigger signature help automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_characters: Option<Vec<String>>,
    /// Characters that re-trigger signature help.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrigger_characters: Option<Vec<String>>,
}

/// On-type formatting options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnTypeFormattingOptions {
    /// The character that triggers formatting.
    pub first_trigger_character: String,
    /// Additional trigger characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_trigger_character: Option<Vec<String>>,
}

/// Execute-command options; the command list is the union across handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandOptions {
    /// The commands the server can execute.
    pub commands: Vec<String>,
}

/// Resolve-capable link/lens options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveProviderOptions {
    /// Whether the server resolves additional detail lazily.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_provider: Option<bool>,
}

/// The aggregate feature set the server reports in the initialize result.
///
/// Each slot is absent (no handler), `true` (feature present, no options),
/// or a structured options object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    /// How text documents are synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_document_sync: Option<TextDocumentSyncOptions>,
    /// Hover support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_provider: Option<bool>,
    /// Completion support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_provider: Option<CompletionOptions>,
    /// Signature help support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_help_provider: Option<SignatureHelpOptions>,
    /// Go-to-declaration support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_provider: Option<bool>,
    /// Go-to-definition support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_provider: Option<bool>,
    /// Go-to-type-definition support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition_provider: Option<bool>,
    /// Go-to-implementation support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_provider: Option<bool>,
    /// Find-references support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references_provider: Option<bool>,
    /// Document highlight support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_highlight_provider: Option<bool>,
    /// Document symbol support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_symbol_provider: Option<bool>,
    /// Code action support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_action_provider: Option<bool>,
    /// Code lens support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_lens_provider: Option<ResolveProviderOptions>,
    /// Document link support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_link_provider: Option<ResolveProviderOptions>,
    /// Color provider support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_provider: Option<bool>,
    /// Whole-document formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_formatting_provider: Option<bool>,
    /// Range formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_range_formatting_provider: Option<bool>,
    /// On-type formatting support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_on_type_formatting_provider: Option<OnTypeFormattingOptions>,
    /// Rename support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename_provider: Option<bool>,
    /// Folding range support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folding_range_provider: Option<bool>,
    /// Selection range support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_range_provider: Option<bool>,
    /// Semantic tokens support, kept opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_tokens_provider: Option<serde_json::Value>,
    /// Workspace symbol support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_symbol_provider: Option<bool>,
    /// Execute-command support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_command_provider: Option<ExecuteCommandOptions>,
    /// Experimental capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Handshake payloads
// ---------------------------------------------------------------------------

/// Client information sent in the initialize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Server information sent in the initialize result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServerInfo {
    /// Create new server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

/// Trace verbosity requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Tracing disabled.
    #[default]
    Off,
    /// Message-level tracing.
    Messages,
    /// Verbose tracing.
    Verbose,
}

/// A workspace folder open in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    /// The folder URI.
    pub uri: Url,
    /// The folder display name.
    pub name: String,
}

/// Parameters of the initialize request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The parent process id, if the client reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<i64>,
    /// Information about the client application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
    /// The client's declared capability tree.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Requested trace level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceLevel>,
    /// Open workspace folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
    /// Server-specific initialization options, kept opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialization_options: Option<serde_json::Value>,
}

/// Result of the initialize request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The synthesized server capability tree.
    pub capabilities: ServerCapabilities,
    /// Information about the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
}

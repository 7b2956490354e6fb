//! Dynamic capability registration wire types.
//!
//! After the handshake, a server may register additional capabilities with
//! `client/registerCapability` and retract them with
//! `client/unregisterCapability`. Each registration carries a fresh
//! server-generated id, the protocol method it covers, and method-specific
//! options; the id is the sole key for later unregistration.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

use crate::capability::TextDocumentSyncKind;
use crate::error::LspResult;
use crate::selector::DocumentSelector;

/// One capability registration sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Server-generated id, used later to unregister.
    pub id: String,
    /// The protocol method being registered.
    pub method: String,
    /// Method-specific options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_options: Option<serde_json::Value>,
}

/// Parameters of `client/registerCapability`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationParams {
    /// The registrations to install.
    pub registrations: Vec<Registration>,
}

/// One capability retraction sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unregistration {
    /// The id the capability was registered under.
    pub id: String,
    /// The protocol method being unregistered.
    pub method: String,
}

/// Parameters of `client/unregisterCapability`.
///
/// The field is spelled `unregisterations` on the wire; the misspelling is
/// part of the protocol and clients reject the corrected form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregistrationParams {
    /// The registrations to retract.
    pub unregisterations: Vec<Unregistration>,
}

/// Method-specific options attached to a dynamic registration.
///
/// Implementations serialize themselves for the wire and expose the pieces
/// the framework itself needs: the document selector for routing and the
/// work-done-progress flag for progress injection. `as_any` allows typed
/// retrieval from the handler table without an enum over every options
/// shape.
pub trait RegistrationOptions: fmt::Debug + Send + Sync {
    /// Serialize the options for the `registerOptions` wire field.
    fn to_value(&self) -> LspResult<serde_json::Value>;

    /// The documents this registration applies to, if it is document-scoped.
    fn document_selector(&self) -> Option<&DocumentSelector> {
        None
    }

    /// Whether the options shape carries the protocol's `workDoneProgress`
    /// field. The server injects its own progress setting into such
    /// options before they go on the wire.
    fn supports_work_done_progress(&self) -> bool {
        false
    }

    /// Typed access for callers that know the concrete options shape.
    fn as_any(&self) -> &dyn Any;
}

macro_rules! impl_registration_options {
    ($ty:ty) => {
        impl RegistrationOptions for $ty {
            fn to_value(&self) -> LspResult<serde_json::Value> {
                Ok(serde_json::to_value(self)?)
            }

            fn document_selector(&self) -> Option<&DocumentSelector> {
                self.document_selector.as_ref()
            }

            fn supports_work_done_progress(&self) -> bool {
                true
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

/// Options for a plain document-scoped registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl TextDocumentRegistrationOptions {
    /// Options scoped to a document selector.
    #[must_use]
    pub fn for_selector(selector: DocumentSelector) -> Self {
        Self {
            document_selector: Some(selector),
            work_done_progress: None,
        }
    }
}

impl_registration_options!(TextDocumentRegistrationOptions);

/// Options for a `textDocument/didChange` registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentChangeRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// How the client should sync changes.
    pub sync_kind: TextDocumentSyncKind,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl TextDocumentChangeRegistrationOptions {
    /// Options with a selector and sync kind.
    #[must_use]
    pub fn new(selector: DocumentSelector, sync_kind: TextDocumentSyncKind) -> Self {
        Self {
            document_selector: Some(selector),
            sync_kind,
            work_done_progress: None,
        }
    }
}

impl_registration_options!(TextDocumentChangeRegistrationOptions);

/// Options for a `textDocument/didSave` registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentSaveRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// Whether the client should include the document text on save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_text: Option<bool>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl_registration_options!(TextDocumentSaveRegistrationOptions);

/// Options for a `textDocument/completion` registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// Characters that trigger completion automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_characters: Option<Vec<String>>,
    /// Whether a resolve handler exists for lazy item detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_provider: Option<bool>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl_registration_options!(CompletionRegistrationOptions);

/// Options for a `textDocument/signatureHelp` registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// Characters that trigger signature help automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_characters: Option<Vec<String>>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl_registration_options!(SignatureHelpRegistrationOptions);

/// Options for registrations with a lazy resolve step (code lens, document
/// link).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRegistrationOptions {
    /// The documents this registration applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selector: Option<DocumentSelector>,
    /// Whether a resolve handler exists for lazy detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_provider: Option<bool>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl_registration_options!(ResolveRegistrationOptions);

/// Options for a `workspace/executeCommand` registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRegistrationOptions {
    /// The commands this handler executes.
    pub commands: Vec<String>,
    /// Whether the handler reports work-done progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_done_progress: Option<bool>,
}

impl ExecuteCommandRegistrationOptions {
    /// Options naming the handler's commands.
    #[must_use]
    pub fn new(commands: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            work_done_progress: None,
        }
    }
}

impl RegistrationOptions for ExecuteCommandRegistrationOptions {
    fn to_value(&self) -> LspResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn supports_work_done_progress(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::DocumentFilter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unregisteration_wire_spelling() {
        let params = UnregistrationParams {
            unregisterations: vec![Unregistration {
                id: "abc".to_string(),
                method: "textDocument/completion".to_string(),
            }],
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"unregisterations\""));
        assert!(!json.contains("\"unregistrations\""));
    }

    #[test]
    fn test_registration_params_shape() {
        let params = RegistrationParams {
            registrations: vec![Registration {
                id: "id-1".to_string(),
                method: "textDocument/hover".to_string(),
                register_options: Some(serde_json::json!({
                    "documentSelector": [{"language": "rust"}]
                })),
            }],
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["registrations"][0]["method"], "textDocument/hover");
        assert_eq!(
            json["registrations"][0]["registerOptions"]["documentSelector"][0]["language"],
            "rust"
        );
    }

    #[test]
    fn test_change_options_carry_sync_kind() {
        let options = TextDocumentChangeRegistrationOptions::new(
            DocumentSelector::for_language("rust"),
            TextDocumentSyncKind::Incremental,
        );
        let value = options.to_value().unwrap();
        assert_eq!(value["syncKind"], 2);
        assert_eq!(value["documentSelector"][0]["language"], "rust");
    }

    #[test]
    fn test_options_selector_access() {
        let options = TextDocumentRegistrationOptions::for_selector(DocumentSelector::new([
            DocumentFilter::for_scheme("file"),
        ]));
        let selector = options.document_selector().unwrap();
        assert_eq!(selector.0.len(), 1);
        // the shape carries the progress field, so injection applies
        assert!(options.supports_work_done_progress());
    }

    #[test]
    fn test_typed_downcast() {
        let options: Box<dyn RegistrationOptions> =
            Box::new(ExecuteCommandRegistrationOptions::new(["refactor.extract"]));
        let concrete = options
            .as_any()
            .downcast_ref::<ExecuteCommandRegistrationOptions>()
            .unwrap();
        assert_eq!(concrete.commands, vec!["refactor.extract".to_string()]);
    }
}

//! Method routing.
//!
//! The router turns an inbound method name (plus its params) into the one
//! handler that should run. Most methods have a single handler and take
//! the fast path. When several handlers share a method, the document the
//! message refers to is extracted from the params and handed to the
//! matcher; if no document can be extracted, or no selector matches, the
//! router falls back to the earliest registered candidate so the message
//! is still served.

use lspkit_core::error::{LspError, LspResult};
use lspkit_core::selector::DocumentAttributes;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::handler::LanguageIdResolver;
use crate::matcher::HandlerMatcher;
use crate::registry::{HandlerCollection, HandlerEntry};

/// Routes inbound methods to handlers.
pub struct Router {
    registry: Arc<HandlerCollection>,
    matchers: Vec<Arc<dyn HandlerMatcher>>,
    resolver: Arc<dyn LanguageIdResolver>,
}

impl Router {
    /// A router over `registry` using the given matchers and language
    /// resolver.
    ///
    /// Matchers are consulted in order; the first to select a candidate
    /// decides the route.
    #[must_use]
    pub fn new(
        registry: Arc<HandlerCollection>,
        matchers: Vec<Arc<dyn HandlerMatcher>>,
        resolver: Arc<dyn LanguageIdResolver>,
    ) -> Self {
        Self {
            registry,
            matchers,
            resolver,
        }
    }

    /// Resolve `method` to a handler entry.
    ///
    /// # Errors
    ///
    /// [`LspError::MethodNotFound`] when no handler is registered for the
    /// method.
    pub fn resolve(&self, method: &str, params: Option<&Value>) -> LspResult<HandlerEntry> {
        let candidates = self.registry.entries_for(method);
        match candidates.len() {
            0 => Err(LspError::method_not_found(method)),
            // fast path, no disambiguation needed
            1 => Ok(candidates.into_iter().next().ok_or_else(|| {
                LspError::internal("handler removed during routing")
            })?),
            _ => {
                // registration order: the earliest handler serves the
                // message when disambiguation cannot decide
                let fallback = candidates[0].clone();
                Ok(self
                    .disambiguate(method, &candidates, params)
                    .unwrap_or(fallback))
            }
        }
    }

    fn disambiguate(
        &self,
        method: &str,
        candidates: &[HandlerEntry],
        params: Option<&Value>,
    ) -> Option<HandlerEntry> {
        let Some(doc) = self.document_attributes(params) else {
            debug!(method, "no document in params, using first handler");
            return None;
        };
        let picked = self
            .matchers
            .iter()
            .find_map(|matcher| matcher.select(candidates, &doc))
            .and_then(|id| candidates.iter().find(|entry| entry.id == id))
            .cloned();
        if picked.is_none() {
            debug!(method, uri = %doc.uri, "no selector matched, using first handler");
        }
        picked
    }

    /// Pull the document the message refers to out of its params.
    ///
    /// The language id comes from the params when present (didOpen carries
    /// it) and from the resolver otherwise.
    fn document_attributes(&self, params: Option<&Value>) -> Option<DocumentAttributes> {
        let text_document = params?.get("textDocument")?;
        let uri = text_document.get("uri")?.as_str()?;
        let uri = Url::parse(uri).ok()?;
        let language_id = text_document
            .get("languageId")
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| self.resolver.resolve(&uri));
        Some(DocumentAttributes::new(uri, language_id))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ExtensionLanguageResolver, HandlerRegistration, handler_fn};
    use crate::matcher::DocumentSelectorMatcher;
    use crate::registry::HandleId;
    use lspkit_core::registration::TextDocumentRegistrationOptions;
    use lspkit_core::selector::DocumentSelector;

    fn router_with(registry: Arc<HandlerCollection>) -> Router {
        Router::new(
            registry,
            vec![Arc::new(DocumentSelectorMatcher)],
            Arc::new(ExtensionLanguageResolver::new()),
        )
    }

    fn hover_for(language: &str) -> HandlerRegistration {
        HandlerRegistration::request(
            "textDocument/hover",
            handler_fn(|_, _| async { Ok(None) }),
        )
        .options(TextDocumentRegistrationOptions::for_selector(
            DocumentSelector::for_language(language),
        ))
    }

    fn hover_params(uri: &str) -> Value {
        serde_json::json!({ "textDocument": { "uri": uri } })
    }

    #[test]
    fn test_unknown_method() {
        let router = router_with(Arc::new(HandlerCollection::new()));
        let err = router.resolve("textDocument/hover", None).unwrap_err();
        assert!(matches!(err, LspError::MethodNotFound { .. }));
    }

    #[test]
    fn test_fast_path_single_handler() {
        let registry = Arc::new(HandlerCollection::new());
        let id = registry.add(hover_for("rust"));
        let router = router_with(registry);
        // even with no params, a single handler is returned directly
        let entry = router.resolve("textDocument/hover", None).unwrap();
        assert_eq!(entry.id, id);
    }

    #[test]
    fn test_selector_disambiguation() {
        let registry = Arc::new(HandlerCollection::new());
        let rust = registry.add(hover_for("rust"));
        let toml = registry.add(hover_for("toml"));
        let router = router_with(registry);

        let params = hover_params("file:///proj/src/lib.rs");
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        assert_eq!(entry.id, rust);

        let params = hover_params("file:///proj/Cargo.toml");
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        assert_eq!(entry.id, toml);
    }

    #[test]
    fn test_language_id_from_params_wins() {
        let registry = Arc::new(HandlerCollection::new());
        let _rust = registry.add(hover_for("rust"));
        let fish = registry.add(hover_for("fish"));
        let router = router_with(registry);

        // extension says rust, but the declared languageId says fish
        let params = serde_json::json!({
            "textDocument": { "uri": "file:///conf/init.rs", "languageId": "fish" }
        });
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        assert_eq!(entry.id, fish);
    }

    #[test]
    fn test_ambiguous_without_document_serves_some_candidate() {
        let registry = Arc::new(HandlerCollection::new());
        let rust = registry.add(hover_for("rust"));
        let toml = registry.add(hover_for("toml"));
        let router = router_with(registry);

        // No document to match on: the message must still be served by one
        // of the registered candidates.
        let entry = router.resolve("textDocument/hover", None).unwrap();
        let served: Vec<HandleId> = vec![rust, toml];
        assert!(served.contains(&entry.id));
    }

    #[test]
    fn test_matchers_consulted_in_order() {
        // Picks the latest-registered candidate, the opposite of the
        // router's fallback, so its selections are observable.
        struct LastRegistered;
        impl HandlerMatcher for LastRegistered {
            fn select(
                &self,
                candidates: &[HandlerEntry],
                _doc: &DocumentAttributes,
            ) -> Option<HandleId> {
                candidates.last().map(|entry| entry.id)
            }
        }

        let registry = Arc::new(HandlerCollection::new());
        let rust = registry.add(hover_for("rust"));
        let toml = registry.add(hover_for("toml"));
        let router = Router::new(
            registry,
            vec![Arc::new(DocumentSelectorMatcher), Arc::new(LastRegistered)],
            Arc::new(ExtensionLanguageResolver::new()),
        );

        // The selector matcher decides; the second matcher never runs.
        let params = hover_params("file:///proj/src/lib.rs");
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        assert_eq!(entry.id, rust);

        // No selector matches: the next matcher in order gets to pick.
        let params = hover_params("file:///notes/readme.md");
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        assert_eq!(entry.id, toml);
    }

    #[test]
    fn test_no_selector_match_falls_back() {
        let registry = Arc::new(HandlerCollection::new());
        let rust = registry.add(hover_for("rust"));
        let toml = registry.add(hover_for("toml"));
        let router = router_with(registry);

        let params = hover_params("file:///notes/readme.md");
        let entry = router.resolve("textDocument/hover", Some(&params)).unwrap();
        let served: Vec<HandleId> = vec![rust, toml];
        assert!(served.contains(&entry.id));
    }
}

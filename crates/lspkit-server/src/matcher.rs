//! Disambiguation between several handlers sharing one method.
//!
//! When a method has more than one registered handler, the router asks a
//! [`HandlerMatcher`] to pick one based on the document the message is
//! about. The stock matcher scores each candidate's document selector and
//! takes the most specific match, falling back to registration order on
//! ties.

use lspkit_core::selector::DocumentAttributes;

use crate::registry::{HandleId, HandlerEntry};

/// Chooses one handler among several candidates for the same method.
pub trait HandlerMatcher: Send + Sync {
    /// Pick the handler for `doc`, or `None` when no candidate matches.
    ///
    /// Candidates arrive in registration order.
    fn select(&self, candidates: &[HandlerEntry], doc: &DocumentAttributes) -> Option<HandleId>;
}

/// Selector-specificity matcher.
///
/// Candidates without a selector never match here; the router's fallback
/// covers them. Specificity ties resolve to the earlier registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentSelectorMatcher;

impl HandlerMatcher for DocumentSelectorMatcher {
    fn select(&self, candidates: &[HandlerEntry], doc: &DocumentAttributes) -> Option<HandleId> {
        let mut best: Option<(u32, HandleId)> = None;
        for entry in candidates {
            let Some(selector) = entry.registration.descriptor().document_selector() else {
                continue;
            };
            let Some(specificity) = selector.match_specificity(doc) else {
                continue;
            };
            // strictly-greater keeps the earliest candidate on ties
            if best.is_none_or(|(top, _)| specificity > top) {
                best = Some((specificity, entry.id));
            }
        }
        best.map(|(_, id)| id)
    }
}

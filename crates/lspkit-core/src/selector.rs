//! Document selectors and filters.
//!
//! When several handlers share a protocol method, each handler's document
//! selector decides which one receives a given document. A selector is a
//! list of filters; a filter names some combination of a language id, a URI
//! scheme, and a glob pattern over the URI path.
//!
//! # Clause matching
//!
//! A filter with exactly one provided clause matches on that clause alone.
//! A filter with several provided clauses matches only when every provided
//! clause matches. An empty filter never matches. This cardinality-dependent
//! rule is relied upon by feature tests at the boundary and must not be
//! normalized to a uniform any/all rule.

use globset::Glob;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The wildcard language id, matching any document language.
pub const ANY_LANGUAGE: &str = "*";

/// A single clause combination filtering documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Language id the document must have (`"*"` matches any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// URI scheme the document must have (e.g. `file`, `untitled`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Glob pattern the URI path must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl DocumentFilter {
    /// Filter on a language id alone.
    #[must_use]
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::default()
        }
    }

    /// Filter on a URI scheme alone.
    #[must_use]
    pub fn for_scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            ..Self::default()
        }
    }

    /// Filter on a glob pattern alone.
    #[must_use]
    pub fn for_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Number of clauses this filter provides.
    #[must_use]
    pub fn clause_count(&self) -> usize {
        usize::from(self.language.is_some())
            + usize::from(self.scheme.is_some())
            + usize::from(self.pattern.is_some())
    }

    fn language_matches(&self, attrs: &DocumentAttributes) -> bool {
        match self.language.as_deref() {
            None => false,
            Some(ANY_LANGUAGE) => true,
            Some(lang) => attrs.language_id.as_deref() == Some(lang),
        }
    }

    fn scheme_matches(&self, attrs: &DocumentAttributes) -> bool {
        self.scheme.as_deref() == Some(attrs.uri.scheme())
    }

    fn pattern_matches(&self, attrs: &DocumentAttributes) -> bool {
        let Some(pattern) = self.pattern.as_deref() else {
            return false;
        };
        Glob::new(pattern)
            .map(|glob| glob.compile_matcher().is_match(attrs.uri.path()))
            .unwrap_or(false)
    }

    /// Whether this filter accepts the given document.
    ///
    /// One provided clause: that clause decides. Several provided clauses:
    /// all of them must hold. No clauses: never matches.
    #[must_use]
    pub fn matches(&self, attrs: &DocumentAttributes) -> bool {
        match self.clause_count() {
            0 => false,
            1 => {
                if self.language.is_some() {
                    self.language_matches(attrs)
                } else if self.scheme.is_some() {
                    self.scheme_matches(attrs)
                } else {
                    self.pattern_matches(attrs)
                }
            }
            _ => {
                (self.language.is_none() || self.language_matches(attrs))
                    && (self.scheme.is_none() || self.scheme_matches(attrs))
                    && (self.pattern.is_none() || self.pattern_matches(attrs))
            }
        }
    }

    /// How specific a successful match is, used to break ties between
    /// several matching handlers. Exact clauses outrank the `*` wildcard.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        let mut score = 0;
        match self.language.as_deref() {
            Some(ANY_LANGUAGE) | None => {}
            Some(_) => score += 4,
        }
        if self.scheme.is_some() {
            score += 2;
        }
        if self.pattern.is_some() {
            score += 1;
        }
        score
    }
}

impl fmt::Display for DocumentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(language) = &self.language {
            parts.push(format!("language:{language}"));
        }
        if let Some(scheme) = &self.scheme {
            parts.push(format!("scheme:{scheme}"));
        }
        if let Some(pattern) = &self.pattern {
            parts.push(format!("pattern:{pattern}"));
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// An ordered list of filters; a document matches the selector when any
/// filter matches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSelector(pub Vec<DocumentFilter>);

impl DocumentSelector {
    /// Create a selector from filters.
    #[must_use]
    pub fn new(filters: impl IntoIterator<Item = DocumentFilter>) -> Self {
        Self(filters.into_iter().collect())
    }

    /// A selector matching one language id.
    #[must_use]
    pub fn for_language(language: impl Into<String>) -> Self {
        Self(vec![DocumentFilter::for_language(language)])
    }

    /// Whether any filter accepts the given document.
    #[must_use]
    pub fn matches(&self, attrs: &DocumentAttributes) -> bool {
        self.0.iter().any(|filter| filter.matches(attrs))
    }

    /// Specificity of the best matching filter, `None` when nothing matches.
    #[must_use]
    pub fn match_specificity(&self, attrs: &DocumentAttributes) -> Option<u32> {
        self.0
            .iter()
            .filter(|filter| filter.matches(attrs))
            .map(DocumentFilter::specificity)
            .max()
    }

    /// Whether the selector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentSelector {
    /// Canonical text form, for logs and error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Resolved attributes of one document, matched against selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAttributes {
    /// The document URI.
    pub uri: Url,
    /// The resolved language id, when known.
    pub language_id: Option<String>,
}

impl DocumentAttributes {
    /// Create attributes for a URI with a known language id.
    #[must_use]
    pub fn new(uri: Url, language_id: Option<String>) -> Self {
        Self { uri, language_id }
    }

    /// The URI scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.uri.scheme()
    }

    /// The URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs(uri: &str, language: Option<&str>) -> DocumentAttributes {
        DocumentAttributes::new(Url::parse(uri).unwrap(), language.map(String::from))
    }

    #[test]
    fn test_single_language_clause() {
        let filter = DocumentFilter::for_language("json");
        assert!(filter.matches(&attrs("file:///a/b.json", Some("json"))));
        assert!(!filter.matches(&attrs("file:///a/b.rs", Some("rust"))));
    }

    #[test]
    fn test_wildcard_language() {
        let filter = DocumentFilter::for_language(ANY_LANGUAGE);
        assert!(filter.matches(&attrs("file:///a/b.json", Some("json"))));
        assert!(filter.matches(&attrs("untitled:Untitled-1", None)));
    }

    #[test]
    fn test_single_scheme_clause() {
        let filter = DocumentFilter::for_scheme("untitled");
        assert!(filter.matches(&attrs("untitled:Untitled-1", None)));
        assert!(!filter.matches(&attrs("file:///a.rs", None)));
    }

    #[test]
    fn test_single_pattern_clause() {
        let filter = DocumentFilter::for_pattern("**/*.toml");
        assert!(filter.matches(&attrs("file:///proj/Cargo.toml", None)));
        assert!(!filter.matches(&attrs("file:///proj/src/main.rs", None)));
    }

    // Boundary case: with two clauses provided, both must hold, even though
    // either alone would match on a single-clause filter.
    #[test]
    fn test_multi_clause_requires_all_provided() {
        let filter = DocumentFilter {
            language: Some("json".to_string()),
            scheme: Some("file".to_string()),
            pattern: None,
        };
        assert!(filter.matches(&attrs("file:///a.json", Some("json"))));
        // Language matches, scheme does not.
        assert!(!filter.matches(&attrs("untitled:Untitled-1", Some("json"))));
        // Scheme matches, language does not.
        assert!(!filter.matches(&attrs("file:///a.rs", Some("rust"))));
    }

    #[test]
    fn test_three_clause_filter() {
        let filter = DocumentFilter {
            language: Some("rust".to_string()),
            scheme: Some("file".to_string()),
            pattern: Some("**/src/**".to_string()),
        };
        assert!(filter.matches(&attrs("file:///proj/src/lib.rs", Some("rust"))));
        assert!(!filter.matches(&attrs("file:///proj/build.rs", Some("rust"))));
    }

    #[test]
    fn test_empty_filter_never_matches() {
        let filter = DocumentFilter::default();
        assert!(!filter.matches(&attrs("file:///a.rs", Some("rust"))));
    }

    #[test]
    fn test_selector_or_across_filters() {
        let selector = DocumentSelector::new([
            DocumentFilter::for_language("json"),
            DocumentFilter::for_language("yaml"),
        ]);
        assert!(selector.matches(&attrs("file:///a.yaml", Some("yaml"))));
        assert!(!selector.matches(&attrs("file:///a.rs", Some("rust"))));
    }

    #[test]
    fn test_specificity_exact_beats_wildcard() {
        let exact = DocumentSelector::for_language("json");
        let wildcard = DocumentSelector::for_language(ANY_LANGUAGE);
        let doc = attrs("file:///a.json", Some("json"));
        assert!(exact.match_specificity(&doc) > wildcard.match_specificity(&doc));
    }

    #[test]
    fn test_display_is_stable() {
        let selector = DocumentSelector::new([DocumentFilter {
            language: Some("json".to_string()),
            scheme: Some("file".to_string()),
            pattern: None,
        }]);
        assert_eq!(selector.to_string(), "language:json+scheme:file");
    }

    #[test]
    fn test_serde_wire_shape() {
        let selector: DocumentSelector =
            serde_json::from_str(r#"[{"language":"json"},{"scheme":"untitled"}]"#).unwrap();
        assert_eq!(selector.0.len(), 2);
        assert_eq!(selector.0[0].language.as_deref(), Some("json"));
    }
}

//! Query classification.
//!
//! A classifier maps a free-text query onto exactly one member of a closed
//! category set. Whatever produces the raw label (a generative model, a
//! language detector, a keyword heuristic) the result goes through the same
//! normalisation policy, and an unusable label resolves to a configured
//! default instead of an error.
//!
//! Two category sets ship with the crate:
//! - [`Topic`]: academic / general / current_events
//! - [`Language`]: the ISO-639-1 codes the encyclopedic backend serves

mod language;
mod topic;

pub use language::{
    known_language_name, language_name, DetectError, Language, LanguageClassifier,
    LanguageDetector, ScriptDetector,
};
pub use topic::{normalize_topic_label, KeywordTopicClassifier, LlmTopicClassifier, Topic};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A closed set of routing categories.
pub trait Category:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static
{
    /// Every member of the set, in declaration order.
    fn all() -> &'static [Self];

    /// Stable identifier used in configs, logs and JSON output.
    fn as_str(&self) -> &'static str;

    /// Extra instructions given to the generative backend for this category.
    fn instructions(&self) -> String;

    /// Instructions for answering a query classified as `classification` and
    /// served by the `served` binding.
    fn answer_instructions(_classification: &Classification<Self>, served: Self) -> String {
        served.instructions()
    }

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

/// Why a classification resolved to the default category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The raw label matched no member of the set.
    Ambiguous,
    /// The backend producing the raw label failed or timed out.
    BackendUnavailable,
    /// The raw label was understood but is outside the allow-list.
    Unsupported,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackReason::Ambiguous => "ambiguous",
            FallbackReason::BackendUnavailable => "backend_unavailable",
            FallbackReason::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification<C: Category> {
    pub category: C,

    /// The raw label before normalisation, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Set when `category` is the default rather than a direct match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

impl<C: Category> Classification<C> {
    pub fn matched(category: C, raw: impl Into<String>) -> Self {
        Self {
            category,
            raw: Some(raw.into()),
            fallback: None,
        }
    }

    pub fn fallback(category: C, reason: FallbackReason, raw: Option<String>) -> Self {
        Self {
            category,
            raw,
            fallback: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[async_trait]
pub trait Classifier<C: Category>: Send + Sync {
    /// Never fails: an unusable label resolves to the configured default.
    async fn classify(&self, query: &str) -> Classification<C>;
}

/// Always answers with the same category. Used when the caller already knows
/// the route (e.g. `--topic academic` on the CLI).
pub struct FixedClassifier<C: Category> {
    category: C,
}

impl<C: Category> FixedClassifier<C> {
    pub fn new(category: C) -> Self {
        Self { category }
    }
}

#[async_trait]
impl<C: Category> Classifier<C> for FixedClassifier<C> {
    async fn classify(&self, _query: &str) -> Classification<C> {
        Classification::matched(self.category, self.category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Topic::parse("Academic"), Some(Topic::Academic));
        assert_eq!(Topic::parse(" current_events "), Some(Topic::CurrentEvents));
        assert_eq!(Topic::parse("sports"), None);
        assert_eq!(Language::parse("ES"), Some(Language::Es));
    }

    #[tokio::test]
    async fn test_fixed_classifier() {
        let classifier = FixedClassifier::new(Topic::Academic);
        let result = classifier.classify("anything at all").await;
        assert_eq!(result.category, Topic::Academic);
        assert!(!result.is_fallback());
    }
}

//! Topic-domain routing: academic / general / current_events.

use super::{Category, Classification, Classifier, FallbackReason};
use crate::generate::prompts;
use crate::GeneratorHandle;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Research-level questions: papers, theory, algorithms, math, science
    Academic,
    /// Broad knowledge: definitions, history, how things work, biographies
    General,
    /// News, latest developments, recent incidents
    CurrentEvents,
}

impl Category for Topic {
    fn all() -> &'static [Self] {
        &[Topic::Academic, Topic::General, Topic::CurrentEvents]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Topic::Academic => "academic",
            Topic::General => "general",
            Topic::CurrentEvents => "current_events",
        }
    }

    fn instructions(&self) -> String {
        match self {
            Topic::Academic => {
                "The context contains research paper abstracts. \
                 Explain the findings precisely and name the papers you rely on."
            }
            Topic::General => {
                "The context contains encyclopedia articles. \
                 Give a clear, factual explanation a non-expert can follow."
            }
            Topic::CurrentEvents => {
                "The context contains recent news and web results. Focus on the latest \
                 developments and mention dates when the context gives them."
            }
        }
        .to_string()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table in precedence order. The first topic with a keyword among the
/// label's word tokens wins, so "academic news" resolves to `Academic`.
const LABEL_PRECEDENCE: &[(Topic, &[&str])] = &[
    (Topic::Academic, &["academic"]),
    (Topic::CurrentEvents, &["current_events", "current", "news"]),
    (Topic::General, &["general"]),
];

/// Map a raw classifier label onto a topic.
///
/// Matching is on lower-cased word tokens (underscores kept), never on raw
/// substrings. Returns `None` when no keyword is present.
pub fn normalize_topic_label(raw: &str) -> Option<Topic> {
    let lower = raw.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();

    LABEL_PRECEDENCE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| tokens.contains(k)))
        .map(|(topic, _)| *topic)
}

fn resolve_label(raw: String, default: Topic) -> Classification<Topic> {
    match normalize_topic_label(&raw) {
        Some(topic) => Classification::matched(topic, raw),
        None => {
            warn!(raw = %raw, fallback = %default, "Unrecognised topic label, using default");
            Classification::fallback(default, FallbackReason::Ambiguous, Some(raw))
        }
    }
}

/// Asks the generative backend for a one-word label.
pub struct LlmTopicClassifier {
    generator: GeneratorHandle,
    default: Topic,
    timeout_ms: u64,
}

impl LlmTopicClassifier {
    pub fn new(generator: GeneratorHandle, default: Topic, timeout_ms: u64) -> Self {
        Self {
            generator,
            default,
            timeout_ms,
        }
    }
}

#[async_trait]
impl Classifier<Topic> for LlmTopicClassifier {
    async fn classify(&self, query: &str) -> Classification<Topic> {
        let prompt = prompts::topic_routing_prompt(query);
        let call = self.generator.generate(&prompt);

        match timeout(Duration::from_millis(self.timeout_ms), call).await {
            Ok(Ok(raw)) => {
                debug!(
                    raw = %raw.trim(),
                    generator = %self.generator.name(),
                    "Topic label received"
                );
                resolve_label(raw.trim().to_string(), self.default)
            }
            Ok(Err(e)) => {
                warn!(error = %e, fallback = %self.default, "Topic classifier backend failed");
                Classification::fallback(self.default, FallbackReason::BackendUnavailable, None)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout_ms,
                    fallback = %self.default,
                    "Topic classifier timed out"
                );
                Classification::fallback(self.default, FallbackReason::BackendUnavailable, None)
            }
        }
    }
}

static ACADEMIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(papers?|research|theory|theorem|proofs?|algorithms?|mathemat\w*|equations?|",
        r"studies|study|arxiv|peer.reviewed|neural|transformers?|deep\s+learning|",
        r"machine\s+learning|quantum|genom\w*|protein|physics|chemistry)\b",
    ))
        .expect("valid academic regex")
});

static CURRENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(latest|news|today|tonight|yesterday|breaking|recent(ly)?|current(ly)?|",
        r"this\s+(week|month|year)|announced|developments?|election|20[2-9]\d)\b",
    ))
        .expect("valid current-events regex")
});

static GENERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(who\s+(is|was)|what\s+(is|are|was)|history\s+of|define|definition|explain|",
        r"how\s+does|biography|origin\s+of|meaning\s+of)\b",
    ))
        .expect("valid general regex")
});

/// Deterministic regex scoring over the query itself; no backend needed.
///
/// It emits a raw label that goes through [`normalize_topic_label`] like any
/// other classifier output.
pub struct KeywordTopicClassifier {
    default: Topic,
}

impl KeywordTopicClassifier {
    pub fn new(default: Topic) -> Self {
        Self { default }
    }

    fn raw_label(query: &str) -> String {
        let score = |re: &Regex| re.find_iter(query).count();
        let scores = [
            (Topic::Academic, score(&ACADEMIC_RE)),
            (Topic::CurrentEvents, score(&CURRENT_RE)),
            (Topic::General, score(&GENERAL_RE)),
        ];

        // Ties keep the earlier entry, which mirrors the label precedence.
        let (best, hits) = scores
            .iter()
            .fold((Topic::General, 0usize), |acc, (topic, hits)| {
                if *hits > acc.1 {
                    (*topic, *hits)
                } else {
                    acc
                }
            });

        if hits == 0 {
            "unknown".to_string()
        } else {
            best.as_str().to_string()
        }
    }
}

#[async_trait]
impl Classifier<Topic> for KeywordTopicClassifier {
    async fn classify(&self, query: &str) -> Classification<Topic> {
        resolve_label(Self::raw_label(query), self.default)
    }
}

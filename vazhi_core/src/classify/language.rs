//! Language routing for the multilingual knowledge base.
//!
//! Detection itself is a collaborator ([`LanguageDetector`]); this module owns
//! what happens to the detected code: normalisation, the supported-language
//! allow-list, and the fallback to the default language.

use super::{Category, Classification, Classifier, FallbackReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Languages the encyclopedic backend is queried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    Hi,
    Pt,
    It,
    Nl,
    Sv,
    Ru,
    Ja,
    Ko,
}

impl Language {
    /// Human-readable name, used to tell the generator which language to answer in.
    pub fn name(&self) -> &'static str {
        language_name(self.as_str())
    }
}

impl Category for Language {
    fn all() -> &'static [Self] {
        &[
            Language::En,
            Language::Es,
            Language::Fr,
            Language::De,
            Language::Hi,
            Language::Pt,
            Language::It,
            Language::Nl,
            Language::Sv,
            Language::Ru,
            Language::Ja,
            Language::Ko,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Hi => "hi",
            Language::Pt => "pt",
            Language::It => "it",
            Language::Nl => "nl",
            Language::Sv => "sv",
            Language::Ru => "ru",
            Language::Ja => "ja",
            Language::Ko => "ko",
        }
    }

    fn instructions(&self) -> String {
        target_language_instructions(self.name())
    }

    /// A known but unsupported code still sets the answer language; only
    /// retrieval falls back to the default edition.
    fn answer_instructions(classification: &Classification<Self>, served: Self) -> String {
        let detected = match (classification.fallback, classification.raw.as_deref()) {
            (Some(FallbackReason::Unsupported), Some(code)) => known_language_name(code),
            _ => None,
        };
        match detected {
            Some(name) => target_language_instructions(name),
            None => served.instructions(),
        }
    }
}

fn target_language_instructions(name: &str) -> String {
    format!(
        "Use ONLY the information in the context when possible. \
         If the answer is not clearly in the context, say you are not sure. \
         Always answer in the target language: {}.",
        name
    )
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a detector code to a language name.
pub fn language_name(code: &str) -> &'static str {
    known_language_name(code).unwrap_or("the same language as the question")
}

/// Name for a code the detector may emit, `None` when it is not recognised.
pub fn known_language_name(code: &str) -> Option<&'static str> {
    let name = match code.trim().to_lowercase().as_str() {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "hi" => "Hindi",
        "pt" => "Portuguese",
        "it" => "Italian",
        "nl" => "Dutch",
        "sv" => "Swedish",
        "ru" => "Russian",
        "zh-cn" => "Chinese (Simplified)",
        "zh-tw" => "Chinese (Traditional)",
        "ja" => "Japanese",
        "ko" => "Korean",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("Input has no detectable language features")]
    Inconclusive,

    #[error("Language detector failed: {0}")]
    Backend(String),
}

/// Maps raw text to a language code such as "en" or "zh-cn".
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<String, DetectError>;
}

/// Unicode-script detection with stopword scoring for Latin-script text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptDetector;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "is", "are", "was", "who", "what", "how", "of", "and", "in", "to", "does", "did",
            "why", "which", "where", "when",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "es", "qué", "quién", "cómo", "de", "del", "y", "en", "por",
            "para", "un", "una", "dónde", "cuál", "inventó",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "est", "qui", "que", "quoi", "comment", "des", "du", "et", "un",
            "une", "pourquoi", "où", "quel", "quelle",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "ist", "wer", "was", "wie", "und", "ein", "eine", "nicht", "warum",
            "wo", "welche", "den", "dem",
        ],
    ),
    (
        "pt",
        &[
            "o", "a", "os", "as", "é", "quem", "que", "como", "do", "da", "e", "um", "uma", "onde",
            "qual", "são",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "gli", "è", "chi", "che", "come", "di", "del", "un", "una", "perché",
            "dove", "quale", "sono",
        ],
    ),
    (
        "nl",
        &[
            "de", "het", "is", "wie", "wat", "hoe", "een", "en", "van", "niet", "waarom", "waar",
            "welke", "zijn",
        ],
    ),
    (
        "sv",
        &[
            "det", "är", "vem", "vad", "hur", "och", "en", "ett", "av", "inte", "varför", "var",
            "vilken", "som",
        ],
    ),
];

const MARKERS: &[(&str, &[char])] = &[
    ("es", &['ñ', '¿', '¡']),
    ("fr", &['ç', 'œ', 'ê', 'è', 'à']),
    ("de", &['ß']),
    ("pt", &['ã', 'õ']),
    ("sv", &['å']),
];

impl ScriptDetector {
    fn script_code(text: &str) -> Option<&'static str> {
        let mut counts = [0usize; 6];
        for c in text.chars() {
            let cp = c as u32;
            let idx = match cp {
                0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => 0,
                0x3040..=0x30FF => 1,
                0x4E00..=0x9FFF => 2,
                0x0900..=0x097F => 3,
                0x0400..=0x04FF => 4,
                0x0600..=0x06FF => 5,
                _ => continue,
            };
            counts[idx] += 1;
        }

        // Kana marks Japanese even when kanji dominate.
        if counts[1] > 0 {
            return Some("ja");
        }
        let codes = ["ko", "ja", "zh-cn", "hi", "ru", "ar"];
        counts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .max_by_key(|(i, n)| (**n, std::cmp::Reverse(*i)))
            .map(|(i, _)| codes[i])
    }

    fn latin_code(text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| !t.is_empty())
            .collect();

        let mut best: Option<(&'static str, usize)> = None;
        for (code, words) in STOPWORDS {
            let mut score = tokens.iter().filter(|t| words.contains(t)).count() * 2;
            if let Some((_, chars)) = MARKERS.iter().find(|(c, _)| c == code) {
                score += lower.chars().filter(|c| chars.contains(c)).count() * 3;
            }
            if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((*code, score));
            }
        }
        best.map(|(code, _)| code)
    }
}

#[async_trait]
impl LanguageDetector for ScriptDetector {
    async fn detect(&self, text: &str) -> Result<String, DetectError> {
        Self::script_code(text)
            .or_else(|| Self::latin_code(text))
            .map(|code| code.to_string())
            .ok_or(DetectError::Inconclusive)
    }
}

/// Turns a detected code into a supported [`Language`].
pub struct LanguageClassifier {
    detector: Arc<dyn LanguageDetector>,
    supported: Vec<Language>,
    default: Language,
    timeout_ms: u64,
}

impl LanguageClassifier {
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        supported: Vec<Language>,
        default: Language,
        timeout_ms: u64,
    ) -> Self {
        Self {
            detector,
            supported,
            default,
            timeout_ms,
        }
    }

    pub fn supported(&self) -> &[Language] {
        &self.supported
    }

    /// Normalise a detector code: trim, lower-case, keep the primary subtag.
    fn primary_subtag(code: &str) -> String {
        code.trim()
            .to_lowercase()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn resolve_code(&self, code: String) -> Classification<Language> {
        match Language::parse(&Self::primary_subtag(&code)) {
            Some(lang) if self.supported.contains(&lang) => Classification::matched(lang, code),
            _ => {
                warn!(
                    code = %code,
                    fallback = %self.default,
                    "Unsupported language, using default"
                );
                Classification::fallback(self.default, FallbackReason::Unsupported, Some(code))
            }
        }
    }
}

#[async_trait]
impl Classifier<Language> for LanguageClassifier {
    async fn classify(&self, query: &str) -> Classification<Language> {
        let detect = self.detector.detect(query);
        match timeout(Duration::from_millis(self.timeout_ms), detect).await {
            Ok(Ok(code)) => {
                debug!(code = %code, "Language detected");
                self.resolve_code(code)
            }
            Ok(Err(DetectError::Inconclusive)) => {
                debug!(fallback = %self.default, "Language detection inconclusive");
                Classification::fallback(self.default, FallbackReason::Ambiguous, None)
            }
            Ok(Err(e)) => {
                warn!(error = %e, fallback = %self.default, "Language detector failed");
                Classification::fallback(self.default, FallbackReason::BackendUnavailable, None)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout_ms,
                    fallback = %self.default,
                    "Language detector timed out"
                );
                Classification::fallback(self.default, FallbackReason::BackendUnavailable, None)
            }
        }
    }
}

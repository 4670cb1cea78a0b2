//! End-to-end orchestrations.
//!
//! Every pipeline follows the same rules: a failing source degrades the
//! context, a context with no records short-circuits before the generator is
//! called, and only a generation failure is surfaced as an error.

mod answer;
mod digest;
mod fact_check;
mod papers;

pub use answer::{AnswerPipeline, AnswerResult, RetrievalResult, RoutingTrace};
pub use digest::{DigestResult, MultiSourceDigest, BACKGROUND_HEADING, NEWS_HEADING};
pub use fact_check::{parse_verdict, FactCheckResult, FactChecker, Verdict};
pub use papers::{PaperSummarizer, PaperSummary, PapersResult, UNKNOWN_AUTHORS, UNKNOWN_TITLE};

use crate::aggregate::Aggregator;
use crate::classify::{
    Classifier, KeywordTopicClassifier, Language, LanguageClassifier, LanguageDetector,
    LlmTopicClassifier, Topic,
};
use crate::config::{RetrieverSpec, RouterConfig};
use crate::error::ConfigError;
use crate::format::ContextFormatter;
use crate::registry::{language_registry, topic_registry};
use crate::{GeneratorHandle, RetrieverHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Answer text used when no source produced any record.
pub const NO_CONTEXT_ANSWER: &str =
    "No grounding context was found for this query, so no answer was generated.";

/// How topics are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicClassifierKind {
    /// Ask the generative backend for a label
    #[default]
    Llm,
    /// Regex keyword scoring, no backend call
    Keywords,
}

/// Aggregator and formatter set up from the shared budgets.
pub fn aggregator_for(config: &RouterConfig) -> Aggregator {
    Aggregator::new(config.timeout_ms).with_retries(config.retrieval_retries)
}

pub fn formatter_for(config: &RouterConfig) -> ContextFormatter {
    ContextFormatter::new(config.max_chars_per_record)
}

fn build_spec(spec: &RetrieverSpec, config: &RouterConfig) -> Result<RetrieverHandle, ConfigError> {
    spec.build(config.timeout_ms)
        .map_err(|e| ConfigError::Invalid(format!("cannot build retriever: {}", e)))
}

/// Topic-routed answering: academic → arXiv, general → Wikipedia,
/// current_events → Tavily (or whatever the config binds).
pub fn topic_pipeline(
    config: &RouterConfig,
    kind: TopicClassifierKind,
    generator: GeneratorHandle,
) -> Result<AnswerPipeline<Topic>, ConfigError> {
    config.validate()?;
    let classifier: Arc<dyn Classifier<Topic>> = match kind {
        TopicClassifierKind::Llm => Arc::new(LlmTopicClassifier::new(
            generator.clone(),
            config.default_topic,
            config.timeout_ms,
        )),
        TopicClassifierKind::Keywords => {
            Arc::new(KeywordTopicClassifier::new(config.default_topic))
        }
    };
    Ok(AnswerPipeline::new(
        classifier,
        Arc::new(topic_registry(config)?),
        generator,
    )
    .with_aggregator(aggregator_for(config))
    .with_formatter(formatter_for(config))
    .with_timeout(config.timeout_ms))
}

/// Language-routed answering against the matching Wikipedia edition.
pub fn language_pipeline(
    config: &RouterConfig,
    detector: Arc<dyn LanguageDetector>,
    generator: GeneratorHandle,
) -> Result<AnswerPipeline<Language>, ConfigError> {
    config.validate()?;
    let classifier = LanguageClassifier::new(
        detector,
        config.supported_languages.clone(),
        config.default_language,
        config.timeout_ms,
    );
    Ok(AnswerPipeline::new(
        Arc::new(classifier),
        Arc::new(language_registry(config)?),
        generator,
    )
    .with_aggregator(aggregator_for(config))
    .with_formatter(formatter_for(config))
    .with_timeout(config.timeout_ms))
}

pub fn digest_pipeline(
    config: &RouterConfig,
    generator: GeneratorHandle,
) -> Result<MultiSourceDigest, ConfigError> {
    config.validate()?;
    Ok(MultiSourceDigest::new(
        build_spec(&config.digest.news, config)?,
        build_spec(&config.digest.background, config)?,
        generator,
    )
    .with_aggregator(aggregator_for(config))
    .with_formatter(formatter_for(config))
    .with_timeout(config.timeout_ms))
}

/// Fact checking against Wikipedia in the default language.
pub fn fact_checker(
    config: &RouterConfig,
    generator: GeneratorHandle,
) -> Result<FactChecker, ConfigError> {
    config.validate()?;
    let spec = RetrieverSpec::wikipedia(
        config.default_language.to_string(),
        config.wikipedia_top_k,
    );
    Ok(FactChecker::new(build_spec(&spec, config)?, generator)
        .with_aggregator(aggregator_for(config))
        .with_formatter(formatter_for(config))
        .with_timeout(config.timeout_ms))
}

/// Paper summaries, using the academic binding's sort order and `paper_count`.
pub fn paper_summarizer(
    config: &RouterConfig,
    generator: GeneratorHandle,
) -> Result<PaperSummarizer, ConfigError> {
    config.validate()?;
    let sort_by = match config.topics.get(&Topic::Academic) {
        Some(RetrieverSpec::Arxiv { sort_by, .. }) => *sort_by,
        _ => Default::default(),
    };
    let spec = RetrieverSpec::Arxiv {
        max_results: config.paper_count,
        sort_by,
    };
    Ok(PaperSummarizer::new(build_spec(&spec, config)?, generator)
        .with_aggregator(aggregator_for(config))
        .with_timeout(config.timeout_ms))
}

//! classify → resolve → aggregate → format → generate.

use super::NO_CONTEXT_ANSWER;
use crate::aggregate::{Aggregator, SourceReport};
use crate::classify::{Category, Classification, Classifier, FallbackReason};
use crate::error::PipelineError;
use crate::format::{ContextFormatter, FormattedContext};
use crate::generate::{generate_with_timeout, prompts};
use crate::record::SourceRecord;
use crate::registry::RetrieverRegistry;
use crate::GeneratorHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a query was routed, for audit and debugging.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingTrace {
    /// Label produced by the classifier before normalisation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,

    /// Set when the category is the default rather than a direct match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,

    /// The registry's allow-list moved the query to its fallback category
    pub redirected: bool,

    /// e.g. "arXiv (academic papers)"
    pub source_description: String,

    /// One report per retriever consulted, in binding order
    pub sources: Vec<SourceReport>,

    pub elapsed_ms: u64,
}

/// Output of retrieve-only mode.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult<C: Category> {
    pub category: C,
    pub trace: RoutingTrace,
    pub context: FormattedContext,
    #[serde(skip)]
    pub records: Vec<SourceRecord>,
    /// Category-specific instructions for the answer prompt
    #[serde(skip)]
    pub instructions: String,
}

impl<C: Category> RetrievalResult<C> {
    /// False when no source produced a record.
    pub fn is_grounded(&self) -> bool {
        !self.context.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult<C: Category> {
    pub category: C,
    pub context: FormattedContext,
    pub answer: String,
    /// False when the answer is the no-context notice and the generator was not called
    pub grounded: bool,
    pub trace: RoutingTrace,
}

pub struct AnswerPipeline<C: Category> {
    classifier: Arc<dyn Classifier<C>>,
    registry: Arc<RetrieverRegistry<C>>,
    aggregator: Aggregator,
    formatter: ContextFormatter,
    generator: GeneratorHandle,
    timeout_ms: u64,
}

impl<C: Category> AnswerPipeline<C> {
    pub fn new(
        classifier: Arc<dyn Classifier<C>>,
        registry: Arc<RetrieverRegistry<C>>,
        generator: GeneratorHandle,
    ) -> Self {
        let aggregator = Aggregator::default();
        Self {
            classifier,
            registry,
            timeout_ms: aggregator.timeout_ms(),
            aggregator,
            formatter: ContextFormatter::default(),
            generator,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_formatter(mut self, formatter: ContextFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Budget for the generation call.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn registry(&self) -> &RetrieverRegistry<C> {
        &self.registry
    }

    /// Everything up to, but not including, generation.
    ///
    /// Never fails: when every source fails or comes back empty the context
    /// is the empty marker and the reports say why.
    pub async fn retrieve(&self, query: &str) -> RetrievalResult<C> {
        let start = Instant::now();

        let classification = self.classifier.classify(query).await;
        let resolved = self.registry.resolve(classification.category);
        info!(
            category = %resolved.category,
            raw = ?classification.raw,
            fallback = ?classification.fallback,
            sources = ?resolved.source_names(),
            "Query routed"
        );

        let (records, sources) = match self.aggregator.aggregate(&resolved.handles, query).await {
            Ok(aggregation) => {
                let sources = aggregation.sources.clone();
                (aggregation.into_records(), sources)
            }
            Err(unavailable) => {
                warn!(category = %resolved.category, "No grounding context available");
                (Vec::new(), unavailable.sources)
            }
        };

        let context = self.formatter.format(&records);
        debug!(
            records = context.record_count,
            truncated = context.truncated_count,
            "Context formatted"
        );

        let instructions = C::answer_instructions(&classification, resolved.category);
        let trace = routing_trace(
            &classification,
            resolved.redirected,
            resolved.description,
            sources,
            start,
        );

        RetrievalResult {
            category: resolved.category,
            trace,
            context,
            records,
            instructions,
        }
    }

    /// Route, retrieve and generate a grounded answer.
    ///
    /// With no context the generator is not called and the answer is
    /// [`NO_CONTEXT_ANSWER`]. A generator error or timeout is the only
    /// failure.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult<C>, PipelineError> {
        let start = Instant::now();
        let retrieval = self.retrieve(query).await;
        let mut trace = retrieval.trace;

        if !retrieval.context.is_empty() {
            let prompt =
                prompts::answer_prompt(&retrieval.context.text, query, &retrieval.instructions);
            let answer = generate_with_timeout(&self.generator, &prompt, self.timeout_ms)
                .await
                .map_err(|e| {
                    warn!(error = %e, generator = %self.generator.name(), "Generation failed");
                    PipelineError::GenerationFailed(e)
                })?;
            trace.elapsed_ms = start.elapsed().as_millis() as u64;

            return Ok(AnswerResult {
                category: retrieval.category,
                context: retrieval.context,
                answer,
                grounded: true,
                trace,
            });
        }

        trace.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(AnswerResult {
            category: retrieval.category,
            context: retrieval.context,
            answer: NO_CONTEXT_ANSWER.to_string(),
            grounded: false,
            trace,
        })
    }
}

fn routing_trace<C: Category>(
    classification: &Classification<C>,
    redirected: bool,
    source_description: String,
    sources: Vec<SourceReport>,
    start: Instant,
) -> RoutingTrace {
    RoutingTrace {
        raw_label: classification.raw.clone(),
        fallback: classification.fallback,
        redirected,
        source_description,
        sources,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FixedClassifier, Topic};
    use crate::error::{GenerationError, RetrievalError};
    use crate::{Generator, Retriever, RetrieverHandle};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned(Vec<&'static str>);

    #[async_trait]
    impl Retriever for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn description(&self) -> &str {
            "canned"
        }
        fn max_results(&self) -> usize {
            10
        }
        async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
            Ok(self
                .0
                .iter()
                .map(|t| SourceRecord::labeled("canned", *t, *t))
                .collect())
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("answer from {} chars", prompt.len()))
        }
    }

    fn pipeline(texts: Vec<&'static str>, generator: Arc<Counting>) -> AnswerPipeline<Topic> {
        let handle: RetrieverHandle = Arc::new(Canned(texts));
        let registry = RetrieverRegistry::builder(Topic::General)
            .bind(Topic::Academic, "papers", vec![handle.clone()])
            .bind(Topic::General, "encyclopedia", vec![handle.clone()])
            .bind(Topic::CurrentEvents, "news", vec![handle])
            .build()
            .unwrap();
        AnswerPipeline::new(
            Arc::new(FixedClassifier::new(Topic::Academic)),
            Arc::new(registry),
            generator,
        )
    }

    #[tokio::test]
    async fn test_answer_uses_context() {
        let generator = Arc::new(Counting::default());
        let result = pipeline(vec!["alpha", "beta"], generator.clone())
            .answer("q")
            .await
            .unwrap();
        assert_eq!(result.category, Topic::Academic);
        assert!(result.grounded);
        assert_eq!(result.context.record_count, 2);
        assert_eq!(result.trace.source_description, "papers");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_context_skips_generator() {
        let generator = Arc::new(Counting::default());
        let result = pipeline(vec![], generator.clone())
            .answer("q")
            .await
            .unwrap();
        assert!(!result.grounded);
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert!(result.context.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieve_does_not_generate() {
        let generator = Arc::new(Counting::default());
        let result = pipeline(vec!["alpha"], generator.clone())
            .retrieve("q")
            .await;
        assert!(result.is_grounded());
        assert_eq!(result.records.len(), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }
}

//! News digest: recent coverage plus background, summarised together.

use crate::aggregate::{Aggregation, Aggregator, SourceReport};
use crate::error::PipelineError;
use crate::format::{ContextFormatter, FormattedContext};
use crate::generate::{generate_with_timeout, prompts};
use crate::record::SourceRecord;
use crate::{GeneratorHandle, RetrieverHandle};
use serde::Serialize;
use tracing::{info, warn};

pub const NEWS_HEADING: &str = "Latest news";
pub const BACKGROUND_HEADING: &str = "Background";

const NO_CONTEXT_DIGEST: &str =
    "No news or background sources returned anything for this topic, so no digest was generated.";

#[derive(Debug, Clone, Serialize)]
pub struct DigestResult {
    pub topic: String,
    pub context: FormattedContext,
    pub summary: String,
    pub grounded: bool,
    pub sources: Vec<SourceReport>,
}

pub struct MultiSourceDigest {
    news: RetrieverHandle,
    background: RetrieverHandle,
    aggregator: Aggregator,
    formatter: ContextFormatter,
    generator: GeneratorHandle,
    timeout_ms: u64,
}

impl MultiSourceDigest {
    pub fn new(
        news: RetrieverHandle,
        background: RetrieverHandle,
        generator: GeneratorHandle,
    ) -> Self {
        let aggregator = Aggregator::default();
        Self {
            news,
            background,
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

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Fetch both sections concurrently and summarise them.
    ///
    /// One failing section leaves its heading with the empty marker; both
    /// failing short-circuits without calling the generator.
    pub async fn summarize(&self, topic: &str) -> Result<DigestResult, PipelineError> {
        let handles = [self.news.clone(), self.background.clone()];

        let aggregation = match self.aggregator.aggregate(&handles, topic).await {
            Ok(aggregation) => aggregation,
            Err(unavailable) => {
                warn!(topic = %topic, "Digest has no sources");
                return Ok(DigestResult {
                    topic: topic.to_string(),
                    context: FormattedContext::empty(),
                    summary: NO_CONTEXT_DIGEST.to_string(),
                    grounded: false,
                    sources: unavailable.sources,
                });
            }
        };

        let news = section(&aggregation, 0);
        let background = section(&aggregation, 1);
        let context = self
            .formatter
            .format_sections(&[(NEWS_HEADING, news), (BACKGROUND_HEADING, background)]);
        info!(
            topic = %topic,
            news = news.len(),
            background = background.len(),
            "Digest context ready"
        );

        let prompt = prompts::digest_prompt(topic, &context.text);
        let summary = generate_with_timeout(&self.generator, &prompt, self.timeout_ms).await?;

        Ok(DigestResult {
            topic: topic.to_string(),
            context,
            summary,
            grounded: true,
            sources: aggregation.sources,
        })
    }
}

/// Records from the handle at `position`, or none if it contributed nothing.
fn section(aggregation: &Aggregation, position: usize) -> &[SourceRecord] {
    aggregation
        .group_at(position)
        .map(|g| g.records.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, RetrievalError};
    use crate::{Generator, Retriever};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Section(&'static str, Option<&'static str>);

    #[async_trait]
    impl Retriever for Section {
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &str {
            self.0
        }
        fn max_results(&self) -> usize {
            3
        }
        async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
            match self.1 {
                Some(text) => Ok(vec![SourceRecord::labeled(self.0, text, text)]),
                None => Err(RetrievalError::RateLimited),
            }
        }
    }

    struct EchoPrompt;

    #[async_trait]
    impl Generator for EchoPrompt {
        fn name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn test_sections_in_prompt() {
        let digest = MultiSourceDigest::new(
            Arc::new(Section("tavily", Some("Regulators met today"))),
            Arc::new(Section("wikipedia", Some("AI regulation is"))),
            Arc::new(EchoPrompt),
        );
        let result = digest.summarize("AI regulation").await.unwrap();
        assert!(result.grounded);
        let news_at = result.summary.find("## Latest news").unwrap();
        let background_at = result.summary.find("## Background").unwrap();
        assert!(news_at < background_at);
        assert_eq!(result.context.record_count, 2);
    }

    #[tokio::test]
    async fn test_one_section_down_still_summarises() {
        let digest = MultiSourceDigest::new(
            Arc::new(Section("tavily", None)),
            Arc::new(Section("wikipedia", Some("Background text"))),
            Arc::new(EchoPrompt),
        );
        let result = digest.summarize("AI regulation").await.unwrap();
        assert!(result.grounded);
        assert!(result.context.text.starts_with("## Latest news\n(no context)"));
        assert!(result.sources[0].is_failure());
    }

    #[tokio::test]
    async fn test_both_down_short_circuits() {
        let digest = MultiSourceDigest::new(
            Arc::new(Section("tavily", None)),
            Arc::new(Section("wikipedia", None)),
            Arc::new(EchoPrompt),
        );
        let result = digest.summarize("AI regulation").await.unwrap();
        assert!(!result.grounded);
        assert_eq!(result.summary, NO_CONTEXT_DIGEST);
        assert_eq!(result.sources.len(), 2);
    }
}

//! Statement verification against encyclopedic context.

use crate::aggregate::{Aggregator, SourceReport};
use crate::error::PipelineError;
use crate::format::{ContextFormatter, FormattedContext};
use crate::generate::{generate_with_timeout, prompts};
use crate::{GeneratorHandle, RetrieverHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

const NO_CONTEXT_EXPLANATION: &str = "No relevant articles were found for this statement.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    False,
    Unknown,
}

impl Verdict {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "true" => Some(Verdict::True),
            "false" => Some(Verdict::False),
            "unknown" => Some(Verdict::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::Unknown => "Unknown",
        })
    }
}

fn first_verdict_token(text: &str) -> Option<Verdict> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .find_map(Verdict::from_token)
}

/// Normalise a free-form reply into a verdict and an explanation.
///
/// A `Verdict:` line wins; otherwise the first verdict word anywhere in the
/// reply; otherwise `Unknown`. The explanation is the `Explanation:` line if
/// present, else the whole reply.
pub fn parse_verdict(reply: &str) -> (Verdict, String) {
    let field = |name: &str| {
        reply.lines().find_map(|line| {
            let line = line.trim().trim_start_matches(['*', '-', ' ']);
            let (key, value) = line.split_once(':')?;
            key.trim()
                .trim_matches('*')
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().trim_matches('*').trim().to_string())
        })
    };

    let verdict = field("verdict")
        .and_then(|v| first_verdict_token(&v))
        .or_else(|| first_verdict_token(reply))
        .unwrap_or(Verdict::Unknown);
    let explanation = field("explanation").unwrap_or_else(|| reply.trim().to_string());
    (verdict, explanation)
}

#[derive(Debug, Clone, Serialize)]
pub struct FactCheckResult {
    pub statement: String,
    pub verdict: Verdict,
    pub explanation: String,
    /// Generator reply before parsing; absent when there was no context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub context: FormattedContext,
    pub sources: Vec<SourceReport>,
}

pub struct FactChecker {
    retriever: RetrieverHandle,
    aggregator: Aggregator,
    formatter: ContextFormatter,
    generator: GeneratorHandle,
    timeout_ms: u64,
}

impl FactChecker {
    pub fn new(retriever: RetrieverHandle, generator: GeneratorHandle) -> Self {
        let aggregator = Aggregator::default();
        Self {
            retriever,
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

    /// No context yields `Unknown` without calling the generator.
    pub async fn check(&self, statement: &str) -> Result<FactCheckResult, PipelineError> {
        let handles = [self.retriever.clone()];
        let aggregation = match self.aggregator.aggregate(&handles, statement).await {
            Ok(aggregation) => aggregation,
            Err(unavailable) => {
                info!(statement = %statement, "No context for statement");
                return Ok(FactCheckResult {
                    statement: statement.to_string(),
                    verdict: Verdict::Unknown,
                    explanation: NO_CONTEXT_EXPLANATION.to_string(),
                    raw: None,
                    context: FormattedContext::empty(),
                    sources: unavailable.sources,
                });
            }
        };

        let records: Vec<_> = aggregation.records().cloned().collect();
        let context = self.formatter.format(&records);
        let prompt = prompts::fact_check_prompt(&context.text, statement);
        let reply = generate_with_timeout(&self.generator, &prompt, self.timeout_ms).await?;

        let (verdict, explanation) = parse_verdict(&reply);
        debug!(verdict = %verdict, "Fact check reply parsed");

        Ok(FactCheckResult {
            statement: statement.to_string(),
            verdict,
            explanation,
            raw: Some(reply),
            context,
            sources: aggregation.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, RetrievalError};
    use crate::record::SourceRecord;
    use crate::{Generator, Retriever};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_structured_reply() {
        let (verdict, explanation) = parse_verdict(
            "Verdict: False\nExplanation: Python was first released in 1991, not 1989.",
        );
        assert_eq!(verdict, Verdict::False);
        assert_eq!(explanation, "Python was first released in 1991, not 1989.");
    }

    #[test]
    fn test_verdict_line_wins_over_earlier_words() {
        let (verdict, _) = parse_verdict("It is not true that...\n**Verdict:** Unknown");
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[test]
    fn test_unstructured_reply() {
        let (verdict, explanation) = parse_verdict("True. The context confirms it.");
        assert_eq!(verdict, Verdict::True);
        assert_eq!(explanation, "True. The context confirms it.");

        let (verdict, _) = parse_verdict("I cannot tell.");
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[test]
    fn test_words_containing_verdicts_do_not_match() {
        let (verdict, _) = parse_verdict("Untrue claims are falsehoods");
        assert_eq!(verdict, Verdict::Unknown);
    }

    struct Articles(bool);

    #[async_trait]
    impl Retriever for Articles {
        fn name(&self) -> &'static str {
            "wikipedia"
        }
        fn description(&self) -> &str {
            "Wikipedia (general knowledge)"
        }
        fn max_results(&self) -> usize {
            3
        }
        async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
            if self.0 {
                Ok(vec![SourceRecord::labeled(
                    "wikipedia",
                    "Python (programming language)",
                    "Python was first released in 1991.",
                )])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[derive(Default)]
    struct Judge {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for Judge {
        fn name(&self) -> &str {
            "judge"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Verdict: False\nExplanation: Released in 1991.".into())
        }
    }

    #[tokio::test]
    async fn test_check_with_context() {
        let judge = Arc::new(Judge::default());
        let checker = FactChecker::new(Arc::new(Articles(true)), judge.clone());
        let result = checker.check("Python was created in 1989").await.unwrap();
        assert_eq!(result.verdict, Verdict::False);
        assert_eq!(result.explanation, "Released in 1991.");
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_without_context() {
        let judge = Arc::new(Judge::default());
        let checker = FactChecker::new(Arc::new(Articles(false)), judge.clone());
        let result = checker.check("Python was created in 1989").await.unwrap();
        assert_eq!(result.verdict, Verdict::Unknown);
        assert!(result.raw.is_none());
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }
}

//! Literature review helper: fetch papers and summarise each abstract.

use crate::aggregate::{Aggregator, SourceReport};
use crate::error::PipelineError;
use crate::generate::{generate_with_timeout, prompts};
use crate::record::SourceRecord;
use crate::{GeneratorHandle, RetrieverHandle};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_AUTHORS: &str = "Unknown authors";

#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    pub title: String,
    pub authors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PapersResult {
    pub query: String,
    pub papers: Vec<PaperSummary>,
    pub sources: Vec<SourceReport>,
}

struct PaperFields<'a> {
    title: &'a str,
    authors: &'a str,
    abstract_text: &'a str,
}

fn paper_fields(record: &SourceRecord) -> PaperFields<'_> {
    PaperFields {
        title: record.meta_str(&["title", "Title"]).unwrap_or(UNKNOWN_TITLE),
        authors: record
            .meta_str(&["authors", "Authors"])
            .unwrap_or(UNKNOWN_AUTHORS),
        abstract_text: record
            .meta_str(&["summary", "Summary"])
            .unwrap_or_else(|| record.text()),
    }
}

pub struct PaperSummarizer {
    retriever: RetrieverHandle,
    aggregator: Aggregator,
    generator: GeneratorHandle,
    timeout_ms: u64,
}

impl PaperSummarizer {
    pub fn new(retriever: RetrieverHandle, generator: GeneratorHandle) -> Self {
        let aggregator = Aggregator::default();
        Self {
            retriever,
            timeout_ms: aggregator.timeout_ms(),
            aggregator,
            generator,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Summaries in retrieval order. No papers means an empty list; any
    /// per-paper generation failure fails the whole call.
    pub async fn summarize(&self, query: &str) -> Result<PapersResult, PipelineError> {
        let handles = [self.retriever.clone()];
        let (records, sources) = match self.aggregator.aggregate(&handles, query).await {
            Ok(aggregation) => {
                let sources = aggregation.sources.clone();
                (aggregation.into_records(), sources)
            }
            Err(unavailable) => {
                info!(query = %query, "No papers found");
                (Vec::new(), unavailable.sources)
            }
        };

        let papers = try_join_all(records.iter().map(|record| self.summarize_one(record))).await?;

        Ok(PapersResult {
            query: query.to_string(),
            papers,
            sources,
        })
    }

    async fn summarize_one(&self, record: &SourceRecord) -> Result<PaperSummary, PipelineError> {
        let fields = paper_fields(record);
        debug!(title = %fields.title, "Summarising paper");
        let prompt =
            prompts::paper_summary_prompt(fields.title, fields.authors, fields.abstract_text);
        let summary = generate_with_timeout(&self.generator, &prompt, self.timeout_ms).await?;

        Ok(PaperSummary {
            title: fields.title.to_string(),
            authors: fields.authors.to_string(),
            published: record.meta_str(&["published"]).map(|s| s.to_string()),
            url: record
                .meta_str(&["pdf_url", "entry_id"])
                .map(|s| s.to_string()),
            summary,
        })
    }
}

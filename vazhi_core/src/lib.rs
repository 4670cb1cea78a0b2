// src/lib.rs
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod generate;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod retrievers;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::aggregate::{Aggregation, Aggregator, SourceReport, SourceStatus};
pub use crate::classify::{Category, Classification, Classifier, FallbackReason};
pub use crate::config::{ConfigStore, RouterConfig};
pub use crate::error::{
    AllSourcesUnavailable, ConfigError, GenerationError, PipelineError, RetrievalError,
};
pub use crate::format::{ContextFormatter, FormattedContext};
pub use crate::record::{MetadataValue, SourceRecord};
pub use crate::registry::{Resolved, RetrieverRegistry};

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns the unique name of the retriever (used as the source tag in reports).
    fn name(&self) -> &'static str;

    /// Human-readable description of the backend, e.g. "arXiv (academic papers)".
    fn description(&self) -> &str;

    /// Upper bound on the number of records a single `fetch` may return.
    fn max_results(&self) -> usize;

    /// Fetch records for `query`, in the backend's own order.
    ///
    /// An empty vector is a valid answer ("no hits"); failures are reported
    /// as [`RetrievalError`] and never panic.
    async fn fetch(&self, query: &str) -> Result<Vec<SourceRecord>, RetrievalError>;
}

/// A shared, read-only handle to a retriever.
pub type RetrieverHandle = Arc<dyn Retriever>;

/// The generative backend: a prompt goes in, text comes out.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub type GeneratorHandle = Arc<dyn Generator>;

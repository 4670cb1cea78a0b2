//! Parallel retrieval across the handles bound to a category.
//!
//! This module provides:
//! - `Aggregator`: runs retrievers concurrently with a per-source timeout
//! - `Aggregation`: merged records plus one `SourceReport` per handle
//!
//! # Example
//!
//! ```ignore
//! use vazhi_core::aggregate::Aggregator;
//!
//! let resolved = registry.resolve(Topic::CurrentEvents);
//! let merged = Aggregator::new(10_000).aggregate(&resolved.handles, "AI regulation").await?;
//! ```

mod engine;
mod types;

pub use engine::{Aggregator, DEFAULT_TIMEOUT_MS};
pub use types::{Aggregation, SourceReport, SourceResults, SourceStatus};

//! Aggregation engine.
//!
//! Fans a query out to every retriever bound to a category, waits for all of
//! them, and merges what came back in handle order.

use super::{Aggregation, SourceReport, SourceResults, SourceStatus};
use crate::error::{AllSourcesUnavailable, RetrievalError};
use crate::record::SourceRecord;
use crate::RetrieverHandle;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const RETRY_BASE_DELAY_MS: u64 = 100;

/// Runs retrievers in parallel under a per-source time budget.
#[derive(Debug, Clone)]
pub struct Aggregator {
    timeout_ms: u64,
    retries: u32,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Aggregator {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            retries: 0,
        }
    }

    /// Extra attempts for transient failures. Zero (the default) means each
    /// source is tried exactly once.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Fetch `query` from every handle and merge the results.
    ///
    /// Records are grouped by source in handle order; within a group the
    /// retriever's own order is kept. A failing or empty source is reported
    /// and skipped. When no source yields a single record the reports are
    /// returned as [`AllSourcesUnavailable`].
    pub async fn aggregate(
        &self,
        handles: &[RetrieverHandle],
        query: &str,
    ) -> Result<Aggregation, AllSourcesUnavailable> {
        let start = Instant::now();
        let mut result = Aggregation::new(query);

        let futures: Vec<_> = handles
            .iter()
            .map(|handle| self.fetch_one(handle, query))
            .collect();

        let outcomes = futures::future::join_all(futures).await;

        for (position, (handle, outcome)) in handles.iter().zip(outcomes).enumerate() {
            let (fetched, attempts, elapsed) = outcome;
            let mut report = SourceReport {
                source: handle.name().to_string(),
                description: handle.description().to_string(),
                status: SourceStatus::Empty,
                attempts,
                duration_ms: Some(elapsed),
            };

            match fetched {
                Ok(mut records) if !records.is_empty() => {
                    records.truncate(handle.max_results());
                    report.status = SourceStatus::Ok {
                        count: records.len(),
                    };
                    debug!(
                        source = handle.name(),
                        count = records.len(),
                        "Source returned records"
                    );
                    result.add_group(
                        SourceResults {
                            source: handle.name().to_string(),
                            position,
                            records,
                        },
                        report,
                    );
                }
                Ok(_) => {
                    info!(source = handle.name(), "Source returned no records");
                    result.add_miss(report);
                }
                Err(e) => {
                    warn!(
                        source = handle.name(),
                        code = e.code_str(),
                        attempts,
                        error = %e,
                        "Source failed"
                    );
                    report.status = SourceStatus::Failed {
                        code: e.code_str().to_string(),
                        error: e.to_string(),
                        is_timeout: e.is_timeout(),
                    };
                    result.add_miss(report);
                }
            }
        }

        result.duration_ms = Some(start.elapsed().as_millis() as u64);

        if result.is_empty() {
            warn!(query = %query, sources = handles.len(), "No source returned any records");
            return Err(AllSourcesUnavailable {
                sources: result.sources,
            });
        }

        Ok(result)
    }

    /// One source, with timeout and bounded retries. Returns the final
    /// outcome, the number of attempts and the elapsed milliseconds.
    async fn fetch_one(
        &self,
        handle: &RetrieverHandle,
        query: &str,
    ) -> (Result<Vec<SourceRecord>, RetrievalError>, u32, u64) {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let call = handle.fetch(query);
            let outcome = match timeout(Duration::from_millis(self.timeout_ms), call).await {
                Ok(fetched) => fetched,
                Err(_) => Err(RetrievalError::Timeout(self.timeout_ms)),
            };

            match outcome {
                Err(e) if e.is_retryable() && attempt <= self.retries => {
                    let delay = RETRY_BASE_DELAY_MS * u64::from(attempt);
                    debug!(
                        source = handle.name(),
                        attempt,
                        delay_ms = delay,
                        error = %e,
                        "Retrying source"
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
                other => return (other, attempt, start.elapsed().as_millis() as u64),
            }
        }
    }
}

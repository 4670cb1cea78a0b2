//! Concrete retrieval backends.
//!
//! Each backend turns its upstream response into [`SourceRecord`]s and maps
//! every upstream problem onto [`RetrievalError`]. Response parsing lives in
//! plain functions so it can be tested without the network.
//!
//! [`SourceRecord`]: crate::record::SourceRecord

pub mod arxiv;
pub mod tavily;
pub mod wikipedia;

pub use arxiv::{ArxivRetriever, ArxivSort};
pub use tavily::{SearchDepth, TavilyOptions, TavilyRetriever, TavilyTopic};
pub use wikipedia::WikipediaRetriever;

use crate::error::RetrievalError;
use reqwest::{Client, Response};
use std::time::Duration;

const USER_AGENT: &str = concat!("vazhi/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. `timeout_ms` bounds the whole request; the aggregator
/// applies its own budget on top.
pub fn http_client(timeout_ms: u64) -> Result<Client, RetrievalError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(RetrievalError::Http)
}

/// Turn a non-success response into the matching error, keeping a bounded
/// slice of the body for the report.
pub(crate) async fn check_status(response: Response) -> Result<Response, RetrievalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(RetrievalError::from_status(status, body))
}

//! Tavily web/news search backend.

use super::{check_status, http_client};
use crate::error::RetrievalError;
use crate::record::{Metadata, SourceRecord};
use crate::Retriever;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const API_URL: &str = "https://api.tavily.com/search";

pub const API_KEY_ENV: &str = "TAVILY_API_KEY";

pub const DESCRIPTION: &str = "Tavily (current news/web)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TavilyTopic {
    General,
    #[default]
    News,
}

impl TavilyTopic {
    fn as_str(&self) -> &'static str {
        match self {
            TavilyTopic::General => "general",
            TavilyTopic::News => "news",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TavilyOptions {
    pub k: usize,
    pub topic: TavilyTopic,
    pub depth: SearchDepth,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

impl Default for TavilyOptions {
    fn default() -> Self {
        Self {
            k: 5,
            topic: TavilyTopic::News,
            depth: SearchDepth::Basic,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }
}

pub struct TavilyRetriever {
    client: Client,
    api_key: Option<String>,
    options: TavilyOptions,
}

impl TavilyRetriever {
    /// The key is read from `TAVILY_API_KEY`. A missing key is not an error
    /// here; every fetch then fails with `MissingCredentials`.
    pub fn new(options: TavilyOptions, timeout_ms: u64) -> Result<Self, RetrievalError> {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        Self::with_api_key(options, api_key, timeout_ms)
    }

    pub fn with_api_key(
        options: TavilyOptions,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: http_client(timeout_ms)?,
            api_key,
            options,
        })
    }

    fn request_body(&self, key: &str, query: &str) -> Value {
        let mut body = json!({
            "api_key": key,
            "query": query,
            "topic": self.options.topic.as_str(),
            "search_depth": self.options.depth.as_str(),
            "max_results": self.options.k,
            "include_answer": false,
            "include_images": false
        });
        if !self.options.include_domains.is_empty() {
            body["include_domains"] = json!(self.options.include_domains);
        }
        if !self.options.exclude_domains.is_empty() {
            body["exclude_domains"] = json!(self.options.exclude_domains);
        }
        body
    }
}

#[async_trait]
impl Retriever for TavilyRetriever {
    fn name(&self) -> &'static str {
        "tavily"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn max_results(&self) -> usize {
        self.options.k
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            RetrievalError::MissingCredentials(format!(
                "set {} to enable Tavily search",
                API_KEY_ENV
            ))
        })?;
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("empty query".into()));
        }

        let body = self.request_body(key, query.trim());
        debug!(topic = self.options.topic.as_str(), k = self.options.k, "Querying Tavily");

        let response = self.client.post(API_URL).json(&body).send().await?;
        let value: Value = check_status(response).await?.json().await?;
        parse_results(&value, self.options.k)
    }
}

/// Map a Tavily response onto records, in rank order.
pub fn parse_results(value: &Value, k: usize) -> Result<Vec<SourceRecord>, RetrievalError> {
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| RetrievalError::Parse("Tavily: missing results array".into()))?;

    Ok(results
        .iter()
        .filter_map(|item| {
            let content = item.get("content").and_then(|v| v.as_str())?;
            let content = html_escape::decode_html_entities(content).trim().to_string();
            if content.is_empty() {
                return None;
            }
            Some((item, content))
        })
        .take(k)
        .enumerate()
        .map(|(i, (item, content))| {
            let mut metadata = Metadata::new();
            if let Some(title) = item.get("title").and_then(|v| v.as_str()) {
                metadata.insert(
                    "title".into(),
                    html_escape::decode_html_entities(title).trim().to_string().into(),
                );
            }
            if let Some(url) = item.get("url").and_then(|v| v.as_str()) {
                metadata.insert("source".into(), url.into());
            }
            if let Some(date) = item.get("published_date").and_then(|v| v.as_str()) {
                metadata.insert("published".into(), date.into());
            }
            SourceRecord::new("tavily", content, metadata, i + 1)
        })
        .collect())
}

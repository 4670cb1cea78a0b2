//! Wikipedia MediaWiki API backend, one instance per language edition.

use super::{check_status, http_client};
use crate::error::RetrievalError;
use crate::record::{Metadata, SourceRecord};
use crate::Retriever;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

pub const DESCRIPTION: &str = "Wikipedia (general knowledge)";

pub struct WikipediaRetriever {
    client: Client,
    language: String,
    top_k: usize,
    description: String,
}

impl WikipediaRetriever {
    pub fn new(
        language: impl Into<String>,
        top_k: usize,
        timeout_ms: u64,
    ) -> Result<Self, RetrievalError> {
        let language = language.into().to_lowercase();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(RetrievalError::InvalidInput(format!(
                "invalid Wikipedia language code '{}'",
                language
            )));
        }
        let description = if language == "en" {
            DESCRIPTION.to_string()
        } else {
            format!("Wikipedia {} (general knowledge)", language)
        };
        Ok(Self {
            client: http_client(timeout_ms)?,
            language,
            top_k,
            description,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn base_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.language)
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, RetrievalError> {
        let response = self
            .client
            .get(self.base_url())
            .query(params)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, RetrievalError> {
        let limit = self.top_k.to_string();
        let params = [
            ("list", "search"),
            ("srprop", ""),
            ("srlimit", limit.as_str()),
            ("srsearch", query),
            ("format", "json"),
            ("action", "query"),
        ];
        let data = self.get_json(&params).await?;
        parse_search_titles(&data)
    }

    async fn extracts(&self, titles: &[String]) -> Result<Vec<Page>, RetrievalError> {
        let joined = titles.join("|");
        let limit = titles.len().to_string();
        let params = [
            ("prop", "extracts|info"),
            ("inprop", "url"),
            ("explaintext", ""),
            ("exintro", ""),
            ("exlimit", limit.as_str()),
            ("redirects", ""),
            ("titles", joined.as_str()),
            ("format", "json"),
            ("action", "query"),
        ];
        let data = self.get_json(&params).await?;
        parse_pages(&data)
    }
}

#[async_trait]
impl Retriever for WikipediaRetriever {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn max_results(&self) -> usize {
        self.top_k
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("empty query".into()));
        }

        let titles = self.search_titles(query.trim()).await?;
        debug!(lang = %self.language, hits = titles.len(), "Wikipedia search");
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let pages = self.extracts(&titles).await?;
        Ok(order_by_titles(&titles, pages)
            .into_iter()
            .take(self.top_k)
            .enumerate()
            .map(|(i, page)| page.into_record(&self.language, i + 1))
            .collect())
    }
}

/// One page from an extracts query.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page_id: i64,
    pub title: String,
    pub extract: String,
    pub url: Option<String>,
}

impl Page {
    fn into_record(self, language: &str, position: usize) -> SourceRecord {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), self.title.into());
        metadata.insert("pageid".into(), self.page_id.into());
        metadata.insert("lang".into(), language.into());
        if let Some(url) = self.url {
            metadata.insert("source".into(), url.into());
        }
        SourceRecord::new("wikipedia", self.extract, metadata, position)
    }
}

pub fn parse_search_titles(data: &Value) -> Result<Vec<String>, RetrievalError> {
    let results = data
        .get("query")
        .and_then(|q| q.get("search"))
        .and_then(|s| s.as_array())
        .ok_or_else(|| RetrievalError::Parse("Wikipedia search: unexpected response".into()))?;

    Ok(results
        .iter()
        .filter_map(|item| item.get("title").and_then(|t| t.as_str()))
        .map(|s| s.to_string())
        .collect())
}

/// Pages with a non-empty extract. Missing pages are skipped.
pub fn parse_pages(data: &Value) -> Result<Vec<Page>, RetrievalError> {
    let pages = data
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(|p| p.as_object())
        .ok_or_else(|| RetrievalError::Parse("Wikipedia extracts: unexpected response".into()))?;

    Ok(pages
        .values()
        .filter(|page| page.get("missing").is_none())
        .filter_map(|page| {
            let title = page.get("title")?.as_str()?.to_string();
            let extract = page.get("extract")?.as_str()?.trim().to_string();
            if extract.is_empty() {
                return None;
            }
            Some(Page {
                page_id: page.get("pageid").and_then(|v| v.as_i64()).unwrap_or_default(),
                title,
                extract,
                url: page
                    .get("fullurl")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            })
        })
        .collect())
}

/// The pages object is keyed by page id; restore search-rank order.
/// Pages whose title was rewritten by a redirect go last, in id order.
fn order_by_titles(titles: &[String], pages: Vec<Page>) -> Vec<Page> {
    let mut remaining = pages;
    let mut ordered = Vec::with_capacity(remaining.len());
    for title in titles {
        if let Some(idx) = remaining.iter().position(|p| &p.title == title) {
            ordered.push(remaining.remove(idx));
        }
    }
    ordered.extend(remaining);
    ordered
}

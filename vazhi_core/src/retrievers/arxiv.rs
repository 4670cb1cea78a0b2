//! arXiv Atom API backend.

use super::{check_status, http_client};
use crate::error::RetrievalError;
use crate::record::{Metadata, SourceRecord};
use crate::Retriever;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const API_URL: &str = "http://export.arxiv.org/api/query";

pub const DESCRIPTION: &str = "arXiv (academic papers)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArxivSort {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl ArxivSort {
    fn as_param(&self) -> &'static str {
        match self {
            ArxivSort::Relevance => "relevance",
            ArxivSort::LastUpdatedDate => "lastUpdatedDate",
            ArxivSort::SubmittedDate => "submittedDate",
        }
    }
}

/// One Atom `<entry>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArxivPaper {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: String,
    pub categories: Vec<String>,
    pub pdf_url: Option<String>,
}

impl ArxivPaper {
    /// Abstract becomes the record text; title, authors and dates go to metadata.
    fn into_record(self, position: usize) -> SourceRecord {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), collapse_whitespace(&self.title).into());
        if !self.authors.is_empty() {
            metadata.insert("authors".into(), self.authors.join(", ").into());
        }
        if !self.id.is_empty() {
            metadata.insert("entry_id".into(), self.id.clone().into());
        }
        if !self.published.is_empty() {
            metadata.insert("published".into(), self.published.clone().into());
        }
        if !self.categories.is_empty() {
            metadata.insert("categories".into(), self.categories.join(", ").into());
        }
        if let Some(pdf) = self.pdf_url {
            metadata.insert("pdf_url".into(), pdf.into());
        }
        SourceRecord::new(
            "arxiv",
            collapse_whitespace(&self.summary),
            metadata,
            position,
        )
    }
}

pub struct ArxivRetriever {
    client: Client,
    max_results: usize,
    sort_by: ArxivSort,
}

impl ArxivRetriever {
    pub fn new(
        max_results: usize,
        sort_by: ArxivSort,
        timeout_ms: u64,
    ) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: http_client(timeout_ms)?,
            max_results,
            sort_by,
        })
    }

    fn search_url(&self, query: &str) -> Result<Url, RetrievalError> {
        let mut url = Url::parse(API_URL)
            .map_err(|e| RetrievalError::InvalidInput(format!("Failed to parse URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:{}", query))
            .append_pair("start", "0")
            .append_pair("max_results", &self.max_results.to_string())
            .append_pair("sortBy", self.sort_by.as_param())
            .append_pair("sortOrder", "descending");
        Ok(url)
    }
}

#[async_trait]
impl Retriever for ArxivRetriever {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("empty query".into()));
        }

        let url = self.search_url(query.trim())?;
        debug!(url = %url, "Querying arXiv");

        let response = check_status(self.client.get(url).send().await?).await?;
        let body = response.text().await?;
        let papers = parse_feed(&body)?;

        Ok(papers
            .into_iter()
            .take(self.max_results)
            .enumerate()
            .map(|(i, paper)| paper.into_record(i + 1))
            .collect())
    }
}

/// Parse an arXiv Atom feed into papers, in feed order.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivPaper>, RetrievalError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut papers = Vec::new();
    let mut current: Option<ArxivPaper> = None;
    let mut current_tag: Option<String> = None;
    let mut buffer = Vec::new();

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "entry" => current = Some(ArxivPaper::default()),
                    "id" | "title" | "summary" | "published" | "name" if current.is_some() => {
                        current_tag = Some(tag)
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(tag), Some(paper)) = (current_tag.as_deref(), current.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|e| RetrievalError::Parse(format!("arXiv feed: {}", e)))?
                        .to_string();
                    match tag {
                        "id" => paper.id = text.replace("http://arxiv.org/abs/", ""),
                        // Long titles and abstracts arrive split across lines.
                        "title" => paper.title.push_str(&text),
                        "summary" => paper.summary.push_str(&text),
                        "published" => paper.published = text,
                        "name" => paper.authors.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(paper) = current.as_mut() {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let attr = |name: &str| {
                        e.attributes()
                            .filter_map(Result::ok)
                            .find(|a| a.key.as_ref() == name.as_bytes())
                            .map(|a| String::from_utf8_lossy(&a.value).to_string())
                    };
                    match tag.as_str() {
                        "category" => {
                            if let Some(term) = attr("term") {
                                paper.categories.push(term);
                            }
                        }
                        "link" if attr("title").as_deref() == Some("pdf") => {
                            paper.pdf_url = attr("href");
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(paper) = current.take() {
                        papers.push(paper);
                    }
                    current_tag = None;
                } else if current_tag.as_deref() == Some(tag.as_str()) {
                    current_tag = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RetrievalError::Parse(format!("arXiv feed: {}", e))),
            _ => {}
        }
        buffer.clear();
    }

    Ok(papers)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models are based on
      complex recurrent networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link href="http://arxiv.org/pdf/1706.03762v7" rel="related" title="pdf" type="application/pdf"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1512.03385v1</id>
    <published>2015-12-10T19:51:55Z</published>
    <title>Deep Residual Learning for Image Recognition</title>
    <summary>Deeper neural networks are more difficult to train.</summary>
    <author><name>Kaiming He</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.id, "1706.03762v7");
        assert_eq!(first.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(first.categories, vec!["cs.CL", "cs.LG"]);
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/1706.03762v7")
        );
        assert_eq!(papers[1].authors, vec!["Kaiming He"]);
    }

    #[test]
    fn test_feed_title_is_not_a_paper() {
        let papers = parse_feed(FEED).unwrap();
        assert!(papers.iter().all(|p| p.title != "ArXiv Query"));
    }

    #[test]
    fn test_record_conversion() {
        let paper = parse_feed(FEED).unwrap().remove(0);
        let record = paper.into_record(1);
        assert_eq!(record.origin(), "arxiv");
        assert_eq!(record.source_label(), "Attention Is All You Need");
        assert_eq!(
            record.text(),
            "The dominant sequence transduction models are based on complex recurrent networks."
        );
        assert_eq!(
            record.meta_str(&["authors"]),
            Some("Ashish Vaswani, Noam Shazeer")
        );
    }

    #[test]
    fn test_empty_feed() {
        let papers = parse_feed(r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#).unwrap();
        assert!(papers.is_empty());
    }

    #[test]
    fn test_search_url() {
        let retriever = ArxivRetriever::new(3, ArxivSort::SubmittedDate, 1_000).unwrap();
        let url = retriever.search_url("deep learning").unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.contains("search_query=all%3Adeep+learning"));
        assert!(query.contains("max_results=3"));
        assert!(query.contains("sortBy=submittedDate"));
    }
}

//! The uniform unit every retriever produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A metadata value: retrievers only ever attach strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Int(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(n) => Some(*n),
            MetadataValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Int(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Text plus provenance, as returned by a retriever.
///
/// Records are immutable once built; fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    origin: String,
    source_label: String,
    text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Metadata,
}

impl SourceRecord {
    /// Build a record whose label is derived from `metadata`.
    ///
    /// `position` is the 1-indexed rank inside the retriever's response and
    /// only matters when no title, source or page is present.
    pub fn new(
        origin: impl Into<String>,
        text: impl Into<String>,
        metadata: Metadata,
        position: usize,
    ) -> Self {
        let source_label = label_from_metadata(&metadata, position);
        Self {
            origin: origin.into(),
            source_label,
            text: text.into(),
            metadata,
        }
    }

    /// Build a record with an explicit label.
    pub fn labeled(
        origin: impl Into<String>,
        source_label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            source_label: source_label.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Name of the retriever that produced this record.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// First string value found under any of `keys`.
    pub fn meta_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.metadata.get(*k))
            .filter_map(|v| v.as_str())
            .find(|s| !s.trim().is_empty())
    }
}

/// Title, then source, then page, then "Result N".
pub fn label_from_metadata(metadata: &Metadata, position: usize) -> String {
    for key in ["title", "source", "page"] {
        if let Some(value) = metadata.get(key) {
            let rendered = value.to_string();
            if !rendered.trim().is_empty() {
                return rendered.trim().to_string();
            }
        }
    }
    format!("Result {}", position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_label_prefers_title() {
        let m = meta(&[
            ("source", "https://example.com".into()),
            ("title", "Attention Is All You Need".into()),
        ]);
        assert_eq!(label_from_metadata(&m, 1), "Attention Is All You Need");
    }

    #[test]
    fn test_label_falls_back_to_source_then_page() {
        let m = meta(&[("source", "https://example.com/a".into())]);
        assert_eq!(label_from_metadata(&m, 2), "https://example.com/a");

        let m = meta(&[("page", MetadataValue::Int(7))]);
        assert_eq!(label_from_metadata(&m, 2), "7");
    }

    #[test]
    fn test_label_result_n_fallback() {
        let m = meta(&[("title", "   ".into())]);
        assert_eq!(label_from_metadata(&m, 3), "Result 3");
        assert_eq!(label_from_metadata(&Metadata::new(), 1), "Result 1");
    }

    #[test]
    fn test_meta_str_skips_ints_and_blanks() {
        let record = SourceRecord::labeled("arxiv", "Paper", "abstract")
            .with_metadata("Authors", MetadataValue::Int(3))
            .with_metadata("authors", "Ada Lovelace");
        assert_eq!(record.meta_str(&["Authors", "authors"]), Some("Ada Lovelace"));
        assert_eq!(record.meta_str(&["missing"]), None);
    }

    #[test]
    fn test_metadata_serializes_untagged() {
        let record = SourceRecord::labeled("wikipedia", "Rust", "text")
            .with_metadata("pageid", MetadataValue::Int(42))
            .with_metadata("lang", "en");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metadata"]["pageid"], 42);
        assert_eq!(json["metadata"]["lang"], "en");
    }
}

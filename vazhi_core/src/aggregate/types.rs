//! Core types for aggregated retrieval results.

use crate::record::SourceRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a single source contributed to an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Returned at least one record
    Ok { count: usize },
    /// Answered, but with zero records
    Empty,
    /// Errored or timed out
    Failed {
        code: String,
        error: String,
        #[serde(default)]
        is_timeout: bool,
    },
}

/// Per-source outcome, kept for every handle whether it succeeded or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Retriever name
    pub source: String,

    /// Human-readable backend description
    pub description: String,

    pub status: SourceStatus,

    /// Number of fetch attempts made (1 unless retries are enabled)
    pub attempts: u32,

    /// Time spent on this source, all attempts included (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SourceReport {
    /// Whether this source added records to the merged sequence.
    pub fn contributed(&self) -> bool {
        matches!(self.status, SourceStatus::Ok { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

/// Records from one source, in that source's own order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResults {
    /// Retriever name
    pub source: String,

    /// Index of the handle this group came from
    pub position: usize,

    pub records: Vec<SourceRecord>,
}

/// Merged output of one aggregation.
///
/// Groups follow handle order and only contain sources that returned records;
/// `sources` has one report per handle, in handle order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub query: String,

    pub groups: Vec<SourceResults>,

    pub sources: Vec<SourceReport>,

    /// Total records across all groups
    pub total_count: usize,

    /// Whether at least one source failed or came back empty
    #[serde(default)]
    pub partial: bool,

    pub started_at: DateTime<Utc>,

    /// Total time taken (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Aggregation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            groups: Vec::new(),
            sources: Vec::new(),
            total_count: 0,
            partial: false,
            started_at: Utc::now(),
            duration_ms: None,
        }
    }

    /// Add a source that returned records.
    pub fn add_group(&mut self, group: SourceResults, report: SourceReport) {
        self.total_count += group.records.len();
        self.groups.push(group);
        self.sources.push(report);
    }

    /// Add a source that contributed nothing.
    pub fn add_miss(&mut self, report: SourceReport) {
        self.partial = true;
        self.sources.push(report);
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Merged records: grouped by source, handle order, per-source order kept.
    pub fn records(&self) -> impl Iterator<Item = &SourceRecord> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    pub fn into_records(self) -> Vec<SourceRecord> {
        self.groups.into_iter().flat_map(|g| g.records).collect()
    }

    /// The group produced by the handle at `position`, if it returned records.
    pub fn group_at(&self, position: usize) -> Option<&SourceResults> {
        self.groups.iter().find(|g| g.position == position)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.is_failure())
    }

    pub fn completed(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.contributed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(source: &str, status: SourceStatus) -> SourceReport {
        SourceReport {
            source: source.to_string(),
            description: String::new(),
            status,
            attempts: 1,
            duration_ms: Some(5),
        }
    }

    #[test]
    fn test_aggregation_grouped() {
        let mut agg = Aggregation::new("test query");

        agg.add_group(
            SourceResults {
                source: "tavily".into(),
                position: 0,
                records: vec![
                    SourceRecord::labeled("tavily", "A", "first"),
                    SourceRecord::labeled("tavily", "B", "second"),
                ],
            },
            report("tavily", SourceStatus::Ok { count: 2 }),
        );
        agg.add_miss(report(
            "arxiv",
            SourceStatus::Failed {
                code: "timeout".into(),
                error: "Timeout after 10ms".into(),
                is_timeout: true,
            },
        ));
        agg.add_group(
            SourceResults {
                source: "wikipedia".into(),
                position: 2,
                records: vec![SourceRecord::labeled("wikipedia", "C", "third")],
            },
            report("wikipedia", SourceStatus::Ok { count: 1 }),
        );

        assert_eq!(agg.total_count, 3);
        assert!(agg.partial);
        assert_eq!(agg.failed().count(), 1);
        assert_eq!(agg.completed().count(), 2);

        let labels: Vec<&str> = agg.records().map(|r| r.source_label()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert!(agg.group_at(1).is_none());
        assert_eq!(agg.group_at(2).map(|g| g.source.as_str()), Some("wikipedia"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(SourceStatus::Ok { count: 3 }).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["count"], 3);

        let json = serde_json::to_value(SourceStatus::Empty).unwrap();
        assert_eq!(json["status"], "empty");
    }
}

//! Context formatting.
//!
//! Turns an ordered sequence of records into one bounded text blob for a
//! generation prompt. Pure: the same records and budget always produce the
//! same bytes.

use crate::record::SourceRecord;
use serde::{Deserialize, Serialize};

/// Appended to any record cut at the per-record budget.
pub const TRUNCATION_MARKER: &str = " [...]";

/// Text used when there is nothing to format.
pub const EMPTY_CONTEXT: &str = "(no context)";

/// Separator between record blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

pub const DEFAULT_MAX_CHARS_PER_RECORD: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedContext {
    pub text: String,

    /// Number of record blocks in `text`
    pub record_count: usize,

    /// How many of those blocks were cut at the budget
    pub truncated_count: usize,
}

impl FormattedContext {
    pub fn empty() -> Self {
        Self {
            text: EMPTY_CONTEXT.to_string(),
            record_count: 0,
            truncated_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContextFormatter {
    max_chars_per_record: usize,
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS_PER_RECORD)
    }
}

impl ContextFormatter {
    pub fn new(max_chars_per_record: usize) -> Self {
        Self {
            max_chars_per_record,
        }
    }

    pub fn max_chars_per_record(&self) -> usize {
        self.max_chars_per_record
    }

    /// Format records as `[label]\ncontent` blocks joined by a blank line.
    ///
    /// Budgets count Unicode scalar values, not bytes. Content longer than the
    /// budget is cut to exactly the budget and followed by
    /// [`TRUNCATION_MARKER`]. An empty input yields [`EMPTY_CONTEXT`].
    pub fn format(&self, records: &[SourceRecord]) -> FormattedContext {
        if records.is_empty() {
            return FormattedContext::empty();
        }

        let mut truncated_count = 0;
        let blocks: Vec<String> = records
            .iter()
            .map(|record| {
                let (block, truncated) = self.block(record);
                if truncated {
                    truncated_count += 1;
                }
                block
            })
            .collect();

        FormattedContext {
            text: blocks.join(BLOCK_SEPARATOR),
            record_count: records.len(),
            truncated_count,
        }
    }

    /// Format several record groups under `## heading` lines.
    ///
    /// Used when the prompt should keep sources apart (e.g. news vs.
    /// background). A group with no records still gets its heading followed
    /// by [`EMPTY_CONTEXT`].
    pub fn format_sections(&self, sections: &[(&str, &[SourceRecord])]) -> FormattedContext {
        if sections.iter().all(|(_, records)| records.is_empty()) {
            return FormattedContext::empty();
        }

        let mut record_count = 0;
        let mut truncated_count = 0;
        let parts: Vec<String> = sections
            .iter()
            .map(|(heading, records)| {
                let inner = self.format(records);
                record_count += inner.record_count;
                truncated_count += inner.truncated_count;
                format!("## {}\n{}", heading, inner.text)
            })
            .collect();

        FormattedContext {
            text: parts.join(BLOCK_SEPARATOR),
            record_count,
            truncated_count,
        }
    }

    fn block(&self, record: &SourceRecord) -> (String, bool) {
        let content = record.text().trim();
        let (content, truncated) = truncate_chars(content, self.max_chars_per_record);
        let mut block = format!("[{}]\n{}", record.source_label(), content);
        if truncated {
            block.push_str(TRUNCATION_MARKER);
        }
        (block, truncated)
    }
}

/// Cut `text` to at most `max` chars, reporting whether anything was dropped.
fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(label: &str, text: &str) -> SourceRecord {
        SourceRecord::labeled("test", label, text)
    }

    #[test]
    fn test_empty_input_has_marker() {
        let ctx = ContextFormatter::new(10).format(&[]);
        assert_eq!(ctx.text, EMPTY_CONTEXT);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_blocks_keep_order_and_labels() {
        let ctx = ContextFormatter::new(100).format(&[rec("A", "alpha"), rec("B", " beta \n")]);
        assert_eq!(ctx.text, "[A]\nalpha\n\n[B]\nbeta");
        assert_eq!(ctx.record_count, 2);
        assert_eq!(ctx.truncated_count, 0);
    }

    #[test]
    fn test_truncation_is_exact() {
        let ctx = ContextFormatter::new(5).format(&[rec("A", "abcdefgh"), rec("B", "abcde")]);
        assert_eq!(ctx.text, "[A]\nabcde [...]\n\n[B]\nabcde");
        assert_eq!(ctx.truncated_count, 1);
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let ctx = ContextFormatter::new(3).format(&[rec("ja", "日本語の文章")]);
        assert_eq!(ctx.text, "[ja]\n日本語 [...]");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let ctx = ContextFormatter::new(50).format(&[rec("A", "same"), rec("A", "same")]);
        assert_eq!(ctx.record_count, 2);
        assert_eq!(ctx.text.matches("[A]").count(), 2);
    }

    #[test]
    fn test_sections() {
        let news = vec![rec("N1", "headline")];
        let background: Vec<SourceRecord> = vec![];
        let ctx = ContextFormatter::new(50).format_sections(&[
            ("Latest news", news.as_slice()),
            ("Background", background.as_slice()),
        ]);
        assert_eq!(
            ctx.text,
            "## Latest news\n[N1]\nheadline\n\n## Background\n(no context)"
        );
        assert_eq!(ctx.record_count, 1);
    }

    proptest! {
        #[test]
        fn prop_format_is_deterministic(
            texts in proptest::collection::vec(".{0,120}", 0..6),
            budget in 0usize..64,
        ) {
            let records: Vec<SourceRecord> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| rec(&format!("R{}", i), t))
                .collect();
            let formatter = ContextFormatter::new(budget);
            prop_assert_eq!(formatter.format(&records), formatter.format(&records));
        }

        #[test]
        fn prop_truncation_respects_budget(text in "\\PC{0,200}", budget in 1usize..100) {
            let ctx = ContextFormatter::new(budget).format(&[rec("X", &text)]);
            let body = ctx.text.strip_prefix("[X]\n").unwrap();
            let trimmed = text.trim();
            if trimmed.chars().count() > budget {
                let kept = body.strip_suffix(TRUNCATION_MARKER).unwrap();
                prop_assert_eq!(kept.chars().count(), budget);
                prop_assert!(trimmed.starts_with(kept));
            } else {
                prop_assert_eq!(body, trimmed);
            }
        }
    }
}

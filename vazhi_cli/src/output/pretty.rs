//! Pretty formatter for terminal output.
//!
//! Routing first, then the per-source table, then the answer, so the part
//! a reader cares about most ends up closest to the prompt.

use super::OutputData;
use crate::commands::Result;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table,
};
use owo_colors::OwoColorize;
use vazhi_core::aggregate::{SourceReport, SourceStatus};
use vazhi_core::classify::Category;
use vazhi_core::pipeline::{PaperSummary, RoutingTrace, Verdict};
use vazhi_core::registry::BindingInfo;

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

/// Long lines are hard to read even on wide terminals
const MAX_WIDTH: usize = 100;

/// Indent for card content (after number)
const CARD_INDENT: usize = 5;

// ============================================================================
// Public API
// ============================================================================

pub fn render(data: &OutputData) -> Result<String> {
    let width = terminal_width();
    let mut out = String::new();

    match data {
        OutputData::Answer(result) => {
            render_routing(&mut out, result.category.as_str(), &result.trace, width);
            render_sources(&mut out, &result.trace.sources, width);
            render_body(&mut out, "Answer", &result.answer, result.grounded, width);
        }
        OutputData::MultilingualAnswer(result) => {
            let label = format!("{} ({})", result.category.as_str(), result.category.name());
            render_routing(&mut out, &label, &result.trace, width);
            render_sources(&mut out, &result.trace.sources, width);
            render_body(&mut out, "Answer", &result.answer, result.grounded, width);
        }
        OutputData::Retrieval(result) => {
            render_routing(&mut out, result.category.as_str(), &result.trace, width);
            render_sources(&mut out, &result.trace.sources, width);
            push_line(
                &mut out,
                section_header("Context", Some(result.context.record_count), width),
            );
            push_line(&mut out, indent(&result.context.text, 2));
            if result.context.truncated_count > 0 {
                push_line(
                    &mut out,
                    format!("  {} record(s) truncated", result.context.truncated_count)
                        .dimmed()
                        .to_string(),
                );
            }
            out.push('\n');
        }
        OutputData::Digest(result) => {
            push_line(&mut out, section_header(&format!("Digest: {}", result.topic), None, width));
            out.push('\n');
            render_sources(&mut out, &result.sources, width);
            render_body(&mut out, "Summary", &result.summary, result.grounded, width);
        }
        OutputData::FactCheck(result) => {
            push_line(&mut out, section_header("Fact check", None, width));
            push_line(&mut out, format!("  {} {}", "Statement:".dimmed(), result.statement));
            push_line(
                &mut out,
                format!("  {} {}", "Verdict:  ".dimmed(), verdict_label(result.verdict)),
            );
            out.push('\n');
            render_sources(&mut out, &result.sources, width);
            push_line(&mut out, section_header("Explanation", None, width));
            push_line(&mut out, indent(&wrap(&result.explanation, width), 2));
            out.push('\n');
        }
        OutputData::Papers(result) => {
            push_line(
                &mut out,
                section_header(
                    &format!("Papers: {}", result.query),
                    Some(result.papers.len()),
                    width,
                ),
            );
            out.push('\n');
            if result.papers.is_empty() {
                push_line(&mut out, format!("  {}", "No papers found.".yellow()));
                out.push('\n');
            }
            for (i, paper) in result.papers.iter().enumerate() {
                out.push_str(&format_paper_card(paper, i + 1, width));
                out.push('\n');
            }
            render_sources(&mut out, &result.sources, width);
        }
        OutputData::Bindings {
            default_topic,
            default_language,
            topics,
            languages,
        } => {
            push_line(&mut out, section_header("Topics", Some(topics.len()), width));
            push_line(&mut out, bindings_table(topics, default_topic, width));
            out.push('\n');
            push_line(&mut out, section_header("Languages", Some(languages.len()), width));
            push_line(&mut out, bindings_table(languages, default_language, width));
            out.push('\n');
        }
        OutputData::ConfigInfo {
            path,
            exists,
            config,
        } => {
            let state = if *exists {
                "".to_string()
            } else {
                format!(" {}", "(not created yet, showing defaults)".yellow())
            };
            push_line(&mut out, format!("{} {}{}", "Config file:".bold(), path.cyan(), state));
            out.push('\n');
            out.push_str(&serde_yaml::to_string(config)?);
        }
    }

    Ok(out)
}

// ============================================================================
// Sections
// ============================================================================

fn render_routing(out: &mut String, category: &str, trace: &RoutingTrace, width: usize) {
    push_line(out, section_header("Routing", None, width));
    push_line(out, format!("  {} {}", "Category".dimmed(), category.green().bold()));
    push_line(out, format!("  {}   {}", "Source".dimmed(), trace.source_description.cyan()));

    if let Some(reason) = trace.fallback {
        let raw = match &trace.raw_label {
            Some(raw) => format!(" (raw label: \"{}\")", truncate_str(raw, 40)),
            None => String::new(),
        };
        push_line(out, format!("  {} {}{}", "Fallback".dimmed(), reason.yellow(), raw.dimmed()));
    }
    if trace.redirected {
        push_line(out, format!("  {}", "Not in the allow-list, served by the default".yellow()));
    }
    push_line(out, format!("  {}  {} ms", "Elapsed".dimmed(), trace.elapsed_ms));
    out.push('\n');
}

fn render_sources(out: &mut String, sources: &[SourceReport], width: usize) {
    if sources.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width as u16)
        .set_header(vec!["Source", "Status", "Detail", "Tries", "Time"]);

    for report in sources {
        let (status, detail) = status_label(&report.status);
        table.add_row(vec![
            Cell::new(&report.source),
            Cell::new(status),
            Cell::new(truncate_str(&detail, 60)),
            Cell::new(report.attempts),
            Cell::new(
                report
                    .duration_ms
                    .map(|ms| format!("{} ms", ms))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    push_line(out, table.to_string());
    out.push('\n');
}

fn render_body(out: &mut String, heading: &str, text: &str, grounded: bool, width: usize) {
    push_line(out, section_header(heading, None, width));
    let body = indent(&wrap(text, width.saturating_sub(2)), 2);
    if grounded {
        push_line(out, body);
    } else {
        push_line(out, body.yellow().to_string());
    }
    out.push('\n');
}

fn format_paper_card(paper: &PaperSummary, index: usize, width: usize) -> String {
    let mut card = String::new();
    let pad = " ".repeat(CARD_INDENT);

    push_line(
        &mut card,
        format!("{:>3}. {}", index.to_string().dimmed(), paper.title.bold()),
    );

    let mut meta = vec![paper.authors.clone()];
    if let Some(published) = &paper.published {
        meta.push(published.clone());
    }
    push_line(&mut card, format!("{}{}", pad, meta.join(" · ").dimmed()));

    if let Some(url) = &paper.url {
        push_line(
            &mut card,
            format!("{}{}", pad, format_hyperlink(url, url).blue().underline()),
        );
    }

    let summary = wrap(&paper.summary, width.saturating_sub(CARD_INDENT));
    push_line(&mut card, indent(&summary, CARD_INDENT));
    card
}

fn bindings_table(bindings: &[BindingInfo], default: &str, width: usize) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width as u16)
        .set_header(vec!["Category", "Backend", "Sources", "Allowed"]);

    for binding in bindings {
        let category = if binding.category == default {
            format!("{} (default)", binding.category)
        } else {
            binding.category.clone()
        };
        table.add_row(vec![
            category,
            binding.description.clone(),
            binding.sources.join(", "),
            if binding.allowed { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.to_string()
}

// ============================================================================
// Helpers
// ============================================================================

fn status_label(status: &SourceStatus) -> (&'static str, String) {
    match status {
        SourceStatus::Ok { count } => ("ok", format!("{} records", count)),
        SourceStatus::Empty => ("empty", "no results".to_string()),
        SourceStatus::Failed {
            code,
            error,
            is_timeout,
        } => {
            let label = if *is_timeout { "timeout" } else { "failed" };
            (label, format!("{}: {}", code, error))
        }
    }
}

fn verdict_label(verdict: Verdict) -> String {
    match verdict {
        Verdict::True => verdict.green().bold().to_string(),
        Verdict::False => verdict.red().bold().to_string(),
        Verdict::Unknown => verdict.yellow().bold().to_string(),
    }
}

fn section_header(label: &str, count: Option<usize>, width: usize) -> String {
    let count_str = match count {
        Some(n) => format!(" ({})", n),
        None => String::new(),
    };

    let header_text = format!("{}{}", label, count_str);
    let line_len = (width.saturating_sub(header_text.chars().count() + 4)).min(60);
    let line = "─".repeat(line_len);

    format!(
        "{} {} {}",
        "──".cyan(),
        header_text.green().bold(),
        line.cyan()
    )
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

fn wrap(text: &str, width: usize) -> String {
    text.lines()
        .map(|line| textwrap::fill(line, width.max(20)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_str(s: &str, max_len: usize) -> String {
    // Take first line only
    let first_line = s.lines().next().unwrap_or(s);

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
        .min(MAX_WIDTH)
}

/// OSC 8 hyperlink, BEL-terminated.
fn format_hyperlink(url: &str, display_text: &str) -> String {
    format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", url, display_text)
}

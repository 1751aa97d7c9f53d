//! Report generation.
//!
//! Renders an `AggregateReport` as plain text (one line per result),
//! Markdown, or JSON.

use crate::analysis::{
    failures_by_error_kind, group_by_item, group_by_kind, mean_elapsed_ms, retried, slowest,
};
use crate::models::{AggregateReport, ReportStatus, ReportSummary, TaskResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output format of a rendered report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per result
    #[default]
    Text,
    /// Markdown document
    Markdown,
    /// Pretty-printed JSON
    Json,
}

/// Batch context that is not part of the report itself.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Where the work items came from ("mock", "live", ...).
    pub source: String,
    /// Default model of the batch.
    pub model: String,
    pub concurrency: usize,
}

/// Render a report in the requested format.
pub fn render(
    report: &AggregateReport,
    metadata: &ReportMetadata,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_report(report)),
        OutputFormat::Markdown => Ok(generate_markdown_report(report, metadata)),
        OutputFormat::Json => generate_json_report(report, metadata),
    }
}

/// Generate the plain text report: `"{label} for {item}: {text}"` per result.
pub fn generate_text_report(report: &AggregateReport) -> String {
    let mut output = String::new();

    for result in report.results() {
        output.push_str(&text_line(result));
        output.push('\n');
    }

    if report.status() == ReportStatus::CancelledIncomplete {
        output.push_str(&format!(
            "[{}: {} of {} tasks settled]\n",
            report.status(),
            report.len(),
            report.expected()
        ));
    }

    output
}

fn text_line(result: &TaskResult) -> String {
    let label = result.kind.label();
    match (result.text(), result.error()) {
        (Some(text), _) => format!("{} for {}: {}", label, result.item_id, text.trim()),
        (None, Some(error)) => format!("{} for {} failed: {}", label, result.item_id, error),
        (None, None) => format!("{} for {}: <no output>", label, result.item_id),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AggregateReport, metadata: &ReportMetadata) -> String {
    let summary = report.summary();
    let mut output = String::new();

    output.push_str("# Fan-Out Analysis Report\n\n");
    output.push_str(&generate_metadata_section(report, metadata, &summary));
    output.push_str(&generate_summary_section(report, &summary));
    output.push_str(&generate_latency_section(report));
    output.push_str(&generate_results_section(report));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(
    report: &AggregateReport,
    metadata: &ReportMetadata,
    summary: &ReportSummary,
) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Status:** `{}`\n", report.status()));
    section.push_str(&format!(
        "- **Started:** {}\n",
        report.started_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model:** `{}`\n", metadata.model));
    section.push_str(&format!("- **Concurrency:** {}\n", metadata.concurrency));
    section.push_str(&format!(
        "- **Tasks Settled:** {}/{}\n",
        summary.settled, summary.expected
    ));
    section.push_str(&format!("- **Completion Calls:** {}\n", summary.attempts));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        report.duration_seconds()
    ));

    section
}

fn generate_summary_section(report: &AggregateReport, summary: &ReportSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Analysis | ✅ Succeeded | ❌ Failed |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for (kind, counts) in &summary.by_kind {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            kind.label(),
            counts.succeeded,
            counts.failed
        ));
    }
    section.push_str(&format!(
        "| **Total** | **{}** | **{}** |\n\n",
        summary.succeeded, summary.failed
    ));

    let failures = failures_by_error_kind(report.results());
    if !failures.is_empty() {
        section.push_str("### Failures by Error Kind\n\n");
        section.push_str("| Error Kind | Tasks |\n");
        section.push_str("|:---|:---:|\n");

        let mut kinds: Vec<_> = failures.into_iter().collect();
        kinds.sort_by_key(|(kind, count)| (std::cmp::Reverse(*count), kind.as_str()));
        for (kind, count) in kinds {
            section.push_str(&format!("| `{}` | {} |\n", kind, count));
        }
        section.push('\n');
    }

    let retried = retried(report.results());
    if !retried.is_empty() {
        section.push_str(&format!(
            "*{} task(s) needed more than one attempt.*\n\n",
            retried.len()
        ));
    }

    section
}

const SLOWEST_SHOWN: usize = 3;

fn generate_latency_section(report: &AggregateReport) -> String {
    let mut section = String::new();
    let Some(mean) = mean_elapsed_ms(report.results()) else {
        return section;
    };

    section.push_str("### Latency\n\n");
    section.push_str(&format!("Mean per task: {:.0} ms\n\n", mean));

    section.push_str("| Analysis | Mean (ms) |\n");
    section.push_str("|:---|:---:|\n");
    for (kind, results) in group_by_kind(report.results()) {
        if let Some(mean) = mean_elapsed_ms(results.iter().copied()) {
            section.push_str(&format!("| {} | {:.0} |\n", kind.label(), mean));
        }
    }
    section.push('\n');

    section.push_str("#### Slowest Tasks\n\n");
    section.push_str("| Task | Attempts | Elapsed (ms) |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for result in slowest(report.results(), SLOWEST_SHOWN) {
        section.push_str(&format!(
            "| {} for {} | {} | {} |\n",
            result.kind.label(),
            result.item_id,
            result.attempts,
            result.elapsed_ms
        ));
    }
    section.push('\n');

    section
}

fn generate_results_section(report: &AggregateReport) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");

    if report.is_empty() {
        section.push_str("No task settled before the batch ended.\n\n");
        return section;
    }

    for (item, results) in group_by_item(report.results()) {
        section.push_str(&format!("### {}\n\n", item));
        for result in results {
            section.push_str(&generate_result_block(result));
        }
    }

    section
}

fn generate_result_block(result: &TaskResult) -> String {
    let mut block = String::new();

    match (result.text(), result.error()) {
        (Some(text), _) => {
            block.push_str(&format!("#### ✅ {}\n\n", result.kind.label()));
            block.push_str(text.trim());
            block.push_str("\n\n");
        }
        (None, Some(error)) => {
            block.push_str(&format!("#### ❌ {}\n\n", result.kind.label()));
            block.push_str(&format!(
                "**Error:** `{}` after {} attempt(s)\n\n",
                error.service_error().kind,
                result.attempts
            ));
            block.push_str(&format!("> {}\n\n", error.service_error().message));
        }
        (None, None) => {}
    }

    block
}

fn generate_footer() -> String {
    "---\n\n*Report generated by llm-fanout*\n".to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    summary: ReportSummary,
    report: &'a AggregateReport,
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AggregateReport, metadata: &ReportMetadata) -> Result<String> {
    let json = JsonReport {
        metadata,
        summary: report.summary(),
        report,
    };
    serde_json::to_string_pretty(&json).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, TaskError};
    use crate::models::{AnalysisKind, ReportOrder, TaskOutcome};
    use chrono::Utc;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            source: "mock".to_string(),
            model: "gpt-4".to_string(),
            concurrency: 2,
        }
    }

    fn create_test_report(status: ReportStatus) -> AggregateReport {
        let results = vec![
            TaskResult {
                index: 0,
                item_id: "Acme".to_string(),
                kind: AnalysisKind::Price,
                attempts: 1,
                elapsed_ms: 120,
                outcome: TaskOutcome::Success {
                    text: "Fairly valued.\n".to_string(),
                },
            },
            TaskResult {
                index: 1,
                item_id: "Acme".to_string(),
                kind: AnalysisKind::Risk,
                attempts: 3,
                elapsed_ms: 900,
                outcome: TaskOutcome::Failure {
                    error: TaskError::TransientServiceError {
                        attempts: 3,
                        source: ServiceError::rate_limited("too many requests"),
                    },
                },
            },
        ];
        AggregateReport::new(status, ReportOrder::Task, 3, results, Utc::now(), 1.25)
    }

    #[test]
    fn test_generate_text_report() {
        let report = create_test_report(ReportStatus::Complete);
        let text = generate_text_report(&report);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Stock Analysis for Acme: Fairly valued.");
        assert!(lines[1].starts_with("Risk Assessment for Acme failed: transient service error"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_text_report_marks_cancelled() {
        let report = create_test_report(ReportStatus::CancelledIncomplete);
        let text = generate_text_report(&report);
        assert!(text.ends_with("[cancelled-incomplete: 2 of 3 tasks settled]\n"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(ReportStatus::Complete);
        let markdown = generate_markdown_report(&report, &metadata());

        assert!(markdown.contains("# Fan-Out Analysis Report"));
        assert!(markdown.contains("- **Status:** `complete`"));
        assert!(markdown.contains("- **Tasks Settled:** 2/3"));
        assert!(markdown.contains("| Stock Analysis | 1 | 0 |"));
        assert!(markdown.contains("| `rate_limited` | 1 |"));
        assert!(markdown.contains("### Acme"));
        assert!(markdown.contains("**Error:** `rate_limited` after 3 attempt(s)"));
    }

    #[test]
    fn test_markdown_latency_section() {
        let report = create_test_report(ReportStatus::Complete);
        let markdown = generate_markdown_report(&report, &metadata());

        assert!(markdown.contains("### Latency"));
        assert!(markdown.contains("Mean per task: 510 ms"));
        assert!(markdown.contains("| Stock Analysis | 120 |"));
        assert!(markdown.contains("| Risk Assessment | 900 |"));

        let slowest = markdown.find("| Risk Assessment for Acme | 3 | 900 |").unwrap();
        let next = markdown.find("| Stock Analysis for Acme | 1 | 120 |").unwrap();
        assert!(slowest < next);
    }

    #[test]
    fn test_markdown_without_results_has_no_latency() {
        let report = AggregateReport::new(
            ReportStatus::CancelledIncomplete,
            ReportOrder::Task,
            2,
            Vec::new(),
            Utc::now(),
            0.1,
        );
        let markdown = generate_markdown_report(&report, &metadata());
        assert!(!markdown.contains("### Latency"));
        assert!(markdown.contains("No task settled before the batch ended."));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(ReportStatus::CancelledIncomplete);
        let json = generate_json_report(&report, &metadata()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report"]["status"], "cancelled-incomplete");
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["metadata"]["source"], "mock");
        assert_eq!(value["report"]["results"][1]["outcome"]["status"], "failure");
        assert_eq!(
            value["report"]["results"][1]["outcome"]["error"]["error"],
            "transient_service_error"
        );
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report("# hi\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi\n");
    }
}

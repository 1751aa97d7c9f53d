//! Result grouping and statistics.
//!
//! Helpers over the results of an `AggregateReport`, used by the report
//! renderers and the CLI summary.

use crate::error::ServiceErrorKind;
use crate::models::{AnalysisKind, ReportSummary, TaskResult};
use std::collections::{BTreeMap, HashMap};

/// Group results by work item, keeping the order in which items first appear.
pub fn group_by_item(results: &[TaskResult]) -> Vec<(&str, Vec<&TaskResult>)> {
    let mut groups: Vec<(&str, Vec<&TaskResult>)> = Vec::new();

    for result in results {
        match groups.iter_mut().find(|(id, _)| *id == result.item_id) {
            Some((_, group)) => group.push(result),
            None => groups.push((result.item_id.as_str(), vec![result])),
        }
    }

    groups
}

/// Group results by analysis kind.
pub fn group_by_kind(results: &[TaskResult]) -> BTreeMap<AnalysisKind, Vec<&TaskResult>> {
    let mut grouped: BTreeMap<AnalysisKind, Vec<&TaskResult>> = BTreeMap::new();

    for result in results {
        grouped.entry(result.kind).or_default().push(result);
    }

    grouped
}

/// Count failed results by the service error kind that ended them.
pub fn failures_by_error_kind(results: &[TaskResult]) -> HashMap<ServiceErrorKind, usize> {
    let mut counts: HashMap<ServiceErrorKind, usize> = HashMap::new();

    for error in results.iter().filter_map(TaskResult::error) {
        *counts.entry(error.service_error().kind).or_default() += 1;
    }

    counts
}

/// Results that needed more than one attempt, most attempts first.
pub fn retried(results: &[TaskResult]) -> Vec<&TaskResult> {
    let mut retried: Vec<_> = results.iter().filter(|r| r.attempts > 1).collect();
    retried.sort_by_key(|r| std::cmp::Reverse(r.attempts));
    retried
}

/// The `n` slowest results.
pub fn slowest(results: &[TaskResult], n: usize) -> Vec<&TaskResult> {
    let mut sorted: Vec<_> = results.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.elapsed_ms));
    sorted.truncate(n);
    sorted
}

/// Mean elapsed time per result in milliseconds.
pub fn mean_elapsed_ms<'a, I>(results: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a TaskResult>,
{
    let (count, total) = results
        .into_iter()
        .fold((0u64, 0u64), |(count, total), r| (count + 1, total + r.elapsed_ms));
    (count > 0).then(|| total as f64 / count as f64)
}

/// Generate a text summary of result counts.
pub fn generate_summary_text(summary: &ReportSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Settled: {}/{} tasks ({} completion calls)",
        summary.settled, summary.expected, summary.attempts
    ));
    lines.push(format!("- ✅ Succeeded: {}", summary.succeeded));
    lines.push(format!("- ❌ Failed: {}", summary.failed));

    if summary.settled < summary.expected {
        lines.push(format!(
            "- ⏹️  Not settled: {}",
            summary.expected - summary.settled
        ));
    }

    if !summary.by_kind.is_empty() {
        lines.push(String::new());
        lines.push("By Analysis:".to_string());

        for (kind, counts) in &summary.by_kind {
            lines.push(format!(
                "- {}: {} ok, {} failed",
                kind.label(),
                counts.succeeded,
                counts.failed
            ));
        }
    }

    lines.join("\n")
}

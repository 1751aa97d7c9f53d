//! Data models for fan-out analysis.
//!
//! This module contains the core data structures used throughout
//! the crate: work items and their facts, analysis tasks, settled
//! task results, and the aggregate report of one batch.

use crate::error::TaskError;
use crate::prompts::{self, PromptTemplate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Kind of analysis applied to a work item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Stock price analysis
    #[value(alias = "stock")]
    Price,
    /// Financial performance analysis
    #[value(alias = "financials")]
    Financial,
    /// Market sentiment analysis
    Sentiment,
    /// Investment risk assessment
    Risk,
}

impl AnalysisKind {
    /// All kinds, in canonical order.
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Price,
        AnalysisKind::Financial,
        AnalysisKind::Sentiment,
        AnalysisKind::Risk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Price => "price",
            AnalysisKind::Financial => "financial",
            AnalysisKind::Sentiment => "sentiment",
            AnalysisKind::Risk => "risk",
        }
    }

    /// Human-readable heading used when presenting results.
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Price => "Stock Analysis",
            AnalysisKind::Financial => "Financial Analysis",
            AnalysisKind::Sentiment => "Sentiment Analysis",
            AnalysisKind::Risk => "Risk Assessment",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fact about a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    Number(f64),
    Text(String),
    /// A value from a small categorical vocabulary ("Neutral", "High Risk").
    Label(String),
    /// The source had no value for this fact.
    Missing,
}

impl FactValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Number(n) => write!(f, "{}", n),
            FactValue::Text(s) | FactValue::Label(s) => f.write_str(s),
            FactValue::Missing => f.write_str("N/A"),
        }
    }
}

/// One subject of analysis with the facts used to build its prompts.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    id: String,
    facts: BTreeMap<String, FactValue>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            facts: BTreeMap::new(),
        }
    }

    /// Builder-style fact insertion. A repeated name replaces the earlier value.
    pub fn with_fact(mut self, name: impl Into<String>, value: FactValue) -> Self {
        self.facts.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fact(&self, name: &str) -> Option<&FactValue> {
        self.facts.get(name)
    }

    pub fn facts(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One unit of work: a work item paired with an analysis kind.
#[derive(Debug, Clone)]
pub struct Task {
    /// Position in the batch's task list.
    pub index: usize,
    pub item: Arc<WorkItem>,
    pub kind: AnalysisKind,
    pub template: &'static PromptTemplate,
}

impl Task {
    pub fn new(index: usize, item: Arc<WorkItem>, kind: AnalysisKind) -> Self {
        let template = prompts::template_for_item(kind, &item);
        Self {
            index,
            item,
            kind,
            template,
        }
    }

    /// Render this task's prompt text.
    pub fn render_prompt(&self) -> String {
        self.template.render(&self.item)
    }
}

/// Settled outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success { text: String },
    Failure { error: TaskError },
}

/// Result of one task, tagged with its work item and analysis kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Position of the task in the batch's task list.
    pub index: usize,
    pub item_id: String,
    pub kind: AnalysisKind,
    /// Number of completion calls made for this task.
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Success { text } => Some(text),
            TaskOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { error } => Some(error),
        }
    }
}

/// Whether every task of a batch settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "complete")]
    Complete,
    /// The batch was cancelled; only tasks that settled before are present.
    #[serde(rename = "cancelled-incomplete")]
    CancelledIncomplete,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Complete => write!(f, "complete"),
            ReportStatus::CancelledIncomplete => write!(f, "cancelled-incomplete"),
        }
    }
}

/// Ordering of `AggregateReport::results`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportOrder {
    /// Task-list order: work item outer, analysis kind inner
    #[default]
    Task,
    /// The order in which tasks settled
    Completion,
}

/// Settled results of one fan-out batch.
///
/// Built once by the aggregator after the batch ends and not modified after.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    status: ReportStatus,
    order: ReportOrder,
    /// Number of tasks the batch was asked to run.
    expected: usize,
    results: Vec<TaskResult>,
    started_at: DateTime<Utc>,
    duration_seconds: f64,
}

impl AggregateReport {
    pub(crate) fn new(
        status: ReportStatus,
        order: ReportOrder,
        expected: usize,
        results: Vec<TaskResult>,
        started_at: DateTime<Utc>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            status,
            order,
            expected,
            results,
            started_at,
            duration_seconds,
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn order(&self) -> ReportOrder {
        self.order
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReportStatus::Complete
    }

    /// Look up the result for a (work item, analysis kind) pair.
    pub fn get(&self, item_id: &str, kind: AnalysisKind) -> Option<&TaskResult> {
        self.results
            .iter()
            .find(|r| r.item_id == item_id && r.kind == kind)
    }

    pub fn successes(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_results(self.expected, &self.results)
    }
}

/// Success/failure counts for one analysis kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Summary counts of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub expected: usize,
    pub settled: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Total completion calls, retries included.
    pub attempts: u64,
    pub by_kind: BTreeMap<AnalysisKind, KindSummary>,
}

impl ReportSummary {
    /// Creates a summary from settled results.
    pub fn from_results(expected: usize, results: &[TaskResult]) -> Self {
        let mut summary = Self {
            expected,
            settled: results.len(),
            ..Self::default()
        };

        for result in results {
            summary.attempts += u64::from(result.attempts);
            let entry = summary.by_kind.entry(result.kind).or_default();
            if result.is_success() {
                summary.succeeded += 1;
                entry.succeeded += 1;
            } else {
                summary.failed += 1;
                entry.failed += 1;
            }
        }

        summary
    }
}

//! llm-fanout
//!
//! Bounded parallel fan-out of independent LLM analysis prompts with
//! per-task retries, timeouts and cancellation, plus small sequential
//! workflows (prompt chains, a decision step, a question-answering agent)
//! over the same completion boundary.

pub mod analysis;
pub mod cli;
pub mod completion;
pub mod config;
pub mod console;
pub mod error;
pub mod fanout;
pub mod models;
pub mod prompts;
pub mod report;
pub mod source;
pub mod workflow;

pub use completion::{CompletionRequest, CompletionService, DynCompletionService};
pub use error::{
    ChainAbortError, ClassificationError, ServiceError, ServiceErrorKind, SourceError, TaskError,
    ValidationError,
};
pub use fanout::{FanoutAggregator, FanoutConfig, RetryPolicy};
pub use models::{AggregateReport, AnalysisKind, ReportStatus, TaskResult, WorkItem};

//! Bounded fan-out of analysis tasks.
//!
//! All tasks run as futures on the caller's task; nothing is spawned.
//! `buffer_unordered` keeps at most `concurrency_limit` calls in flight and
//! starts the next queued task (in task-list order) as soon as one settles.
//! Each settled result lands in its own slot, indexed by task position.

use super::retry::{complete_with_retry, RetryPolicy};
use crate::completion::{CompletionRequest, DynCompletionService};
use crate::error::{TaskError, ValidationError};
use crate::models::{
    AggregateReport, AnalysisKind, ReportOrder, ReportStatus, Task, TaskOutcome, TaskResult,
    WorkItem,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of simultaneous completion calls.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Settings shared by every task of a batch.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    pub concurrency: usize,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub order: ReportOrder,
    /// Model used when a kind has no override.
    pub model: String,
    pub kind_models: HashMap<AnalysisKind, String>,
    pub temperature: f32,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            order: ReportOrder::Task,
            model: "gpt-4".to_string(),
            kind_models: HashMap::new(),
            temperature: 0.7,
        }
    }
}

impl FanoutConfig {
    pub fn model_for(&self, kind: AnalysisKind) -> &str {
        self.kind_models
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(&self.model)
    }
}

/// Runs batches of independent analysis calls against one completion service.
pub struct FanoutAggregator {
    service: DynCompletionService,
    config: FanoutConfig,
}

impl FanoutAggregator {
    pub fn new(service: DynCompletionService, config: FanoutConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Cross product of items x kinds; item order outer, kind order inner.
    pub fn build_tasks(items: &[WorkItem], kinds: &[AnalysisKind]) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(items.len() * kinds.len());
        for item in items {
            let item = Arc::new(item.clone());
            for &kind in kinds {
                tasks.push(Task::new(tasks.len(), Arc::clone(&item), kind));
            }
        }
        tasks
    }

    /// Pre-flight checks for a batch.
    pub fn validate(
        items: &[WorkItem],
        kinds: &[AnalysisKind],
        concurrency_limit: usize,
    ) -> Result<(), ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::NoWorkItems);
        }
        if kinds.is_empty() {
            return Err(ValidationError::NoAnalysisKinds);
        }
        if concurrency_limit == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }

        let mut ids = HashSet::new();
        for item in items {
            if !ids.insert(item.id()) {
                return Err(ValidationError::DuplicateWorkItem(item.id().to_string()));
            }
        }

        let mut seen = HashSet::new();
        for &kind in kinds {
            if !seen.insert(kind) {
                return Err(ValidationError::DuplicateAnalysisKind(kind));
            }
        }

        Ok(())
    }

    /// Run every (item, kind) task and return once all have settled.
    ///
    /// Per-task failures are recorded in the report; only pre-flight
    /// validation fails the call as a whole.
    pub async fn submit(
        &self,
        items: &[WorkItem],
        kinds: &[AnalysisKind],
        concurrency_limit: usize,
    ) -> Result<AggregateReport, ValidationError> {
        self.submit_with_cancel(items, kinds, concurrency_limit, &CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), but stops early when `cancel` fires.
    ///
    /// In-flight calls are dropped and no further calls are made. Results
    /// that settled before cancellation are kept and the report is tagged
    /// [`ReportStatus::CancelledIncomplete`].
    pub async fn submit_with_cancel(
        &self,
        items: &[WorkItem],
        kinds: &[AnalysisKind],
        concurrency_limit: usize,
        cancel: &CancellationToken,
    ) -> Result<AggregateReport, ValidationError> {
        Self::validate(items, kinds, concurrency_limit)?;

        let tasks = Self::build_tasks(items, kinds);
        let expected = tasks.len();
        let started_at = Utc::now();
        let started = Instant::now();

        info!(
            "Submitting {} tasks ({} items x {} kinds), concurrency {}",
            expected,
            items.len(),
            kinds.len(),
            concurrency_limit
        );

        let mut slots: Vec<Option<TaskResult>> = vec![None; expected];
        let mut settled_order: Vec<usize> = Vec::with_capacity(expected);

        {
            let pending = stream::iter(tasks)
                .map(|task| self.run_task(task))
                .buffer_unordered(concurrency_limit);
            tokio::pin!(pending);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!(
                            "Batch cancelled with {}/{} tasks settled",
                            settled_order.len(),
                            expected
                        );
                        break;
                    }
                    next = pending.next() => match next {
                        Some(result) => {
                            debug!(
                                "Settled {} for {} after {} attempt(s) [{}/{}]",
                                result.kind,
                                result.item_id,
                                result.attempts,
                                settled_order.len() + 1,
                                expected
                            );
                            let index = result.index;
                            settled_order.push(index);
                            slots[index] = Some(result);
                        }
                        None => break,
                    },
                }
            }
        }

        let status = if settled_order.len() == expected {
            ReportStatus::Complete
        } else {
            ReportStatus::CancelledIncomplete
        };

        let results: Vec<TaskResult> = match self.config.order {
            ReportOrder::Task => slots.into_iter().flatten().collect(),
            ReportOrder::Completion => settled_order
                .iter()
                .filter_map(|&index| slots[index].take())
                .collect(),
        };

        let duration = started.elapsed().as_secs_f64();
        info!(
            "Batch {}: {} of {} tasks settled in {:.1}s",
            status,
            results.len(),
            expected,
            duration
        );

        Ok(AggregateReport::new(
            status,
            self.config.order,
            expected,
            results,
            started_at,
            duration,
        ))
    }

    fn request_for(&self, task: &Task) -> CompletionRequest {
        CompletionRequest::new(self.config.model_for(task.kind), String::new())
            .with_system(task.render_prompt())
            .with_temperature(self.config.temperature)
            .with_timeout(self.config.timeout)
    }

    async fn run_task(&self, task: Task) -> TaskResult {
        let request = self.request_for(&task);
        let call = complete_with_retry(self.service.as_ref(), &request, &self.config.retry).await;

        let outcome = match call.result {
            Ok(text) => TaskOutcome::Success { text },
            Err(source) => {
                let error = TaskError::from_service(source, call.attempts);
                warn!("{} analysis for {} failed: {}", task.kind, task.item.id(), error);
                TaskOutcome::Failure { error }
            }
        };

        TaskResult {
            index: task.index,
            item_id: task.item.id().to_string(),
            kind: task.kind,
            attempts: call.attempts,
            elapsed_ms: call.elapsed.as_millis() as u64,
            outcome,
        }
    }
}

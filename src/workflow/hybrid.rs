//! Hybrid app: decide an action, execute it, summarize the result.

use super::chain::{Pipeline, Stage};
use super::decision::{Action, Decision, DecisionStep, CLARIFICATION_MESSAGE};
use crate::completion::CompletionService;
use crate::error::ChainAbortError;
use crate::fanout::RetryPolicy;
use std::time::Duration;
use tracing::info;

const SUMMARY_TEMPLATE: &str = "Summarize the following text in one paragraph:\n\n{input}";

/// Result of one hybrid run.
#[derive(Debug, Clone)]
pub struct HybridOutcome {
    pub decision: Decision,
    pub result: String,
    /// `None` when the action was [`Action::Clarify`].
    pub summary: Option<String>,
}

/// Decision step followed by an action-specific two-stage pipeline.
#[derive(Debug, Clone)]
pub struct HybridApp {
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
    decision: DecisionStep,
}

impl HybridApp {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            decision: DecisionStep::new(model.clone()),
            model,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_decision_temperature(mut self, temperature: f32) -> Self {
        self.decision = self.decision.with_temperature(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.decision = self.decision.with_timeout(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// User prompt for an executable action; `None` for clarify.
    pub fn action_template(action: Action) -> Option<&'static str> {
        match action {
            Action::Explain => Some("Write a detailed explanation about {input}."),
            Action::StepByStepGuide => Some("Provide a step-by-step guide for {input}."),
            Action::AnswerQuestion => Some("Answer the following question: {input}"),
            Action::Clarify => None,
        }
    }

    fn pipeline(&self, template: &str) -> Pipeline {
        Pipeline::new("hybrid", self.model.clone())
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
            .with_retry(self.retry.clone())
            .stage(Stage::new("execute_action", template))
            .stage(Stage::new("summarize_results", SUMMARY_TEMPLATE))
    }

    pub async fn run(
        &self,
        service: &dyn CompletionService,
        input: &str,
    ) -> Result<HybridOutcome, ChainAbortError> {
        let decision = self.decision.decide(service, input).await;
        info!("Hybrid action: {}", decision.action);

        let Some(template) = Self::action_template(decision.action) else {
            return Ok(HybridOutcome {
                decision,
                result: CLARIFICATION_MESSAGE.to_string(),
                summary: None,
            });
        };

        let output = self.pipeline(template).run(service, input).await?;
        Ok(HybridOutcome {
            decision,
            result: output.get("execute_action").unwrap_or_default().to_string(),
            summary: output.get("summarize_results").map(str::to_string),
        })
    }
}

//! Sequential prompt chains.
//!
//! A [`Pipeline`] is an explicit ordered list of named stages. Each stage's
//! output is passed verbatim as the `{input}` of the next one. A failing
//! stage aborts the chain with its position; nothing after it runs.

use super::faq::FaqBase;
use crate::completion::{CompletionRequest, CompletionService};
use crate::error::ChainAbortError;
use crate::fanout::{complete_with_retry, RetryPolicy};
use std::time::Duration;
use tracing::{debug, info};

/// Placeholder replaced by the previous stage's output.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// One named step of a pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub system_prompt: Option<String>,
    /// User prompt; `{input}` is replaced by the stage input.
    pub user_template: String,
    /// Overrides the pipeline temperature.
    pub temperature: Option<f32>,
}

impl Stage {
    pub fn new(name: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: None,
            user_template: user_template.into(),
            temperature: None,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn render(&self, input: &str) -> String {
        self.user_template.replace(INPUT_PLACEHOLDER, input)
    }
}

/// Output of one completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// 1-based position in the pipeline.
    pub position: usize,
    pub name: String,
    pub text: String,
    pub attempts: u32,
}

/// Outputs of every stage of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutput {
    pub stages: Vec<StageOutput>,
}

impl ChainOutput {
    /// Output of the last stage.
    pub fn final_text(&self) -> Option<&str> {
        self.stages.last().map(|s| s.text.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.text.as_str())
    }
}

/// Ordered pipeline of named stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Stage>,
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            model: model.into(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry policy applied to each stage's own call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Run every stage in order, feeding each output to the next stage.
    pub async fn run(
        &self,
        service: &dyn CompletionService,
        input: &str,
    ) -> Result<ChainOutput, ChainAbortError> {
        let mut output = ChainOutput::default();
        let mut current = input.to_string();

        for (i, stage) in self.stages.iter().enumerate() {
            let position = i + 1;
            debug!("{}: running stage {} ({})", self.name, position, stage.name);

            let mut request = CompletionRequest::new(self.model.clone(), stage.render(&current))
                .with_temperature(stage.temperature.unwrap_or(self.temperature))
                .with_timeout(self.timeout);
            if let Some(system) = &stage.system_prompt {
                request = request.with_system(system.clone());
            }

            let call = complete_with_retry(service, &request, &self.retry).await;
            let text = call.result.map_err(|source| ChainAbortError {
                stage: position,
                stage_name: stage.name.clone(),
                source,
            })?;

            output.stages.push(StageOutput {
                position,
                name: stage.name.clone(),
                text: text.clone(),
                attempts: call.attempts,
            });
            current = text;
        }

        info!("{}: completed {} stage(s)", self.name, output.stages.len());
        Ok(output)
    }

    /// Explain a topic, then summarize the explanation.
    pub fn topic_explainer(model: impl Into<String>) -> Self {
        Pipeline::new("topic_workflow", model)
            .stage(Stage::new(
                "generate_content",
                "Write a detailed explanation about {input}.",
            ))
            .stage(Stage::new(
                "summarize_content",
                "Summarize the following text in one paragraph:\n\n{input}",
            ))
    }

    /// Customer support chain: identify issue, resolve it, follow up.
    pub fn support(model: impl Into<String>, faq: &FaqBase) -> Self {
        let reference = format!(
            "You are a customer support assistant. Use these FAQs as reference:\n\n{}\n\n",
            faq.context()
        );

        Pipeline::new("support_chain", model)
            .stage(
                Stage::new("identify_issue", INPUT_PLACEHOLDER).with_system(format!(
                    "{}Identify the main issue from the user's input and match it with \
                     the most relevant FAQ if applicable.",
                    reference
                )),
            )
            .stage(
                Stage::new("generate_solution", "Issue: {input}").with_system(format!(
                    "{}Provide a detailed solution for the following issue, incorporating \
                     relevant FAQ information if applicable.",
                    reference
                )),
            )
            .stage(
                Stage::new("follow_up", "Solution provided: {input}").with_system(
                    "You are a customer support assistant. Generate a follow-up question to \
                     check if the solution was helpful and if the user needs any clarification.",
                ),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{ScriptedService, Step};
    use crate::error::{ServiceError, ServiceErrorKind};

    #[test]
    fn test_stage_render() {
        let stage = Stage::new("s", "Issue: {input}");
        assert_eq!(stage.render("no login"), "Issue: no login");
    }

    #[tokio::test]
    async fn test_outputs_feed_next_stage_verbatim() {
        let service = ScriptedService::sequence(vec![
            Step::ok("password reset"),
            Step::ok("click forgot password"),
            Step::ok("did that help?"),
        ]);
        let pipeline = Pipeline::support("m", &FaqBase::default());

        let output = pipeline.run(&service, "I can't log in").await.unwrap();

        assert_eq!(output.stages.len(), 3);
        assert_eq!(output.get("generate_solution"), Some("click forgot password"));
        assert_eq!(output.final_text(), Some("did that help?"));

        let requests = service.requests();
        assert_eq!(requests[0].user_prompt, "I can't log in");
        assert_eq!(requests[1].user_prompt, "Issue: password reset");
        assert_eq!(
            requests[2].user_prompt,
            "Solution provided: click forgot password"
        );
        assert!(requests[0]
            .system_prompt
            .as_deref()
            .unwrap()
            .contains("Q: How do I reset my password?"));
    }

    #[tokio::test]
    async fn test_failure_aborts_with_stage_position() {
        let service = ScriptedService::sequence(vec![
            Step::ok("issue"),
            Step::err(ServiceError::invalid_request("context too long")),
            Step::ok("never"),
        ]);
        let pipeline = Pipeline::support("m", &FaqBase::default());

        let err = pipeline.run(&service, "help").await.unwrap_err();

        assert_eq!(err.stage, 2);
        assert_eq!(err.stage_name, "generate_solution");
        assert_eq!(err.source.kind, ServiceErrorKind::InvalidRequest);
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_stage_retries_only_itself() {
        let service = ScriptedService::sequence(vec![
            Step::ok("content"),
            Step::err(ServiceError::rate_limited("429")),
            Step::ok("summary"),
        ]);
        let pipeline = Pipeline::topic_explainer("m").with_retry(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        });

        let output = pipeline.run(&service, "tides").await.unwrap();

        assert_eq!(output.stages[0].attempts, 1);
        assert_eq!(output.stages[1].attempts, 2);
        assert_eq!(output.final_text(), Some("summary"));
        assert_eq!(service.calls(), 3);

        let requests = service.requests();
        assert_eq!(requests[0].user_prompt, "Write a detailed explanation about tides.");
        assert_eq!(
            requests[2].user_prompt,
            "Summarize the following text in one paragraph:\n\ncontent"
        );
    }

    #[test]
    fn test_stage_names() {
        let pipeline = Pipeline::support("m", &FaqBase::default());
        assert_eq!(
            pipeline.stage_names(),
            vec!["identify_issue", "generate_solution", "follow_up"]
        );
    }
}

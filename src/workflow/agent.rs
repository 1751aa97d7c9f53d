//! Minimal autonomous agent: answers questions, asks for details otherwise.

use crate::completion::{CompletionRequest, CompletionService};
use crate::error::ServiceError;
use crate::fanout::{complete_with_retry, RetryPolicy};
use std::time::Duration;
use tracing::debug;

pub const AGENT_SYSTEM_PROMPT: &str = "You are a helpful and autonomous AI assistant. \
Your goal is to assist users by answering their questions, providing recommendations, \
or solving problems. If the user input is unclear, ask for clarification. \
Be concise and helpful in your responses.";

pub const AGENT_CLARIFICATION: &str =
    "I need more information. Can you please ask a question or provide more details?";

/// Reply produced by [`AutonomousAgent::respond`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    Answer(String),
    NeedsDetails,
}

impl AgentReply {
    pub fn text(&self) -> &str {
        match self {
            AgentReply::Answer(text) => text,
            AgentReply::NeedsDetails => AGENT_CLARIFICATION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutonomousAgent {
    system_prompt: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AutonomousAgent {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            system_prompt: AGENT_SYSTEM_PROMPT.to_string(),
            model: model.into(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
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

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Only input containing a question mark is sent to the model.
    pub fn wants_answer(input: &str) -> bool {
        input.contains('?')
    }

    pub async fn respond(
        &self,
        service: &dyn CompletionService,
        input: &str,
    ) -> Result<AgentReply, ServiceError> {
        if !Self::wants_answer(input) {
            debug!("No question in input, asking for details");
            return Ok(AgentReply::NeedsDetails);
        }

        let request = CompletionRequest::new(self.model.clone(), input)
            .with_system(self.system_prompt.clone())
            .with_temperature(self.temperature)
            .with_timeout(self.timeout);

        complete_with_retry(service, &request, &self.retry)
            .await
            .result
            .map(AgentReply::Answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{ScriptedService, Step};

    #[tokio::test]
    async fn test_question_is_sent_with_system_prompt() {
        let service = ScriptedService::sequence(vec![Step::ok("Paris")]);
        let reply = AutonomousAgent::new("m")
            .respond(&service, "capital of France?")
            .await
            .unwrap();

        assert_eq!(reply, AgentReply::Answer("Paris".to_string()));
        let request = &service.requests()[0];
        assert_eq!(request.system_prompt.as_deref(), Some(AGENT_SYSTEM_PROMPT));
        assert_eq!(request.user_prompt, "capital of France?");
    }

    #[tokio::test]
    async fn test_statement_gets_canned_reply() {
        let service = ScriptedService::echo();
        let reply = AutonomousAgent::new("m")
            .respond(&service, "tell me things")
            .await
            .unwrap();

        assert_eq!(reply, AgentReply::NeedsDetails);
        assert_eq!(reply.text(), AGENT_CLARIFICATION);
        assert_eq!(service.calls(), 0);
    }
}

//! Decision step: classify free-form input into a fixed action set.

use crate::completion::{CompletionRequest, CompletionService};
use crate::error::ClassificationError;
use crate::fanout::{complete_with_retry, RetryPolicy};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Reply used whenever the input needs clarification.
pub const CLARIFICATION_MESSAGE: &str =
    "I need more information. Can you please clarify your request?";

/// Actions the decision step can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Explain = 1,
    StepByStepGuide = 2,
    AnswerQuestion = 3,
    Clarify = 4,
}

impl Action {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub const ALL: [Action; 4] = [
        Action::Explain,
        Action::StepByStepGuide,
        Action::AnswerQuestion,
        Action::Clarify,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: i64) -> Option<Action> {
        Action::ALL.into_iter().find(|a| i64::from(a.number()) == n)
    }

    /// Option text shown to the model.
    pub fn description(self) -> &'static str {
        match self {
            Action::Explain => "Generate a detailed explanation.",
            Action::StepByStepGuide => "Provide a step-by-step guide.",
            Action::AnswerQuestion => "Answer a specific question.",
            Action::Clarify => "Ask for clarification if the input is unclear.",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Explain => "explain",
            Action::StepByStepGuide => "step-by-step guide",
            Action::AnswerQuestion => "answer question",
            Action::Clarify => "clarify",
        };
        write!(f, "{} ({})", self.number(), name)
    }
}

/// Outcome of the decision step. Never an error: failures fall back to
/// [`Action::Clarify`] and keep the reason in `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub error: Option<ClassificationError>,
    /// Raw model reply, when there was one.
    pub reply: Option<String>,
}

impl Decision {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    fn fallback(error: ClassificationError, reply: Option<String>) -> Self {
        Self {
            action: Action::Clarify,
            error: Some(error),
            reply,
        }
    }
}

/// Parse the first integer in a reply into an action.
pub fn parse_action(reply: &str) -> Result<Action, ClassificationError> {
    let unparseable = || ClassificationError::Unparseable {
        reply: reply.to_string(),
    };

    let start = reply.find(|c: char| c.is_ascii_digit()).ok_or_else(unparseable)?;
    let digits: String = reply[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let negative = reply[..start].ends_with('-');

    let magnitude: i64 = digits.parse().map_err(|_| unparseable())?;
    let value = if negative { -magnitude } else { magnitude };

    Action::from_number(value).ok_or(ClassificationError::OutOfRange {
        value,
        min: Action::MIN,
        max: Action::MAX,
    })
}

/// Issues one constrained completion call and maps the reply to an action.
#[derive(Debug, Clone)]
pub struct DecisionStep {
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl DecisionStep {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
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

    pub fn prompt(input: &str) -> String {
        let mut prompt = format!(
            "The user has provided the following input: \"{}\".\n\
             Based on this input, decide the best action to take. Your options are:\n",
            input.trim()
        );
        for action in Action::ALL {
            prompt.push_str(&format!("{}. {}\n", action.number(), action.description()));
        }
        prompt.push_str("Return only the number of the chosen action.");
        prompt
    }

    pub async fn decide(&self, service: &dyn CompletionService, input: &str) -> Decision {
        let request = CompletionRequest::new(self.model.clone(), Self::prompt(input))
            .with_temperature(self.temperature)
            .with_timeout(self.timeout);

        let call = complete_with_retry(service, &request, &self.retry).await;
        let reply = match call.result {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Decision call failed, asking for clarification: {}", err);
                return Decision::fallback(ClassificationError::Service(err), None);
            }
        };

        match parse_action(&reply) {
            Ok(action) => {
                debug!("Decided action {}", action);
                Decision {
                    action,
                    error: None,
                    reply: Some(reply),
                }
            }
            Err(err) => {
                warn!("Could not classify reply {:?}: {}", reply.trim(), err);
                Decision::fallback(err, Some(reply))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{ScriptedService, Step};
    use crate::error::ServiceError;

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("2"), Ok(Action::StepByStepGuide));
        assert_eq!(parse_action(" 3.\n"), Ok(Action::AnswerQuestion));
        assert_eq!(parse_action("Action: 1"), Ok(Action::Explain));
        assert_eq!(
            parse_action("7"),
            Err(ClassificationError::OutOfRange {
                value: 7,
                min: 1,
                max: 4
            })
        );
        assert!(matches!(
            parse_action("-1"),
            Err(ClassificationError::OutOfRange { value: -1, .. })
        ));
        assert!(matches!(
            parse_action("explain it"),
            Err(ClassificationError::Unparseable { .. })
        ));
        assert!(matches!(
            parse_action("99999999999999999999999"),
            Err(ClassificationError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_prompt_lists_all_actions() {
        let prompt = DecisionStep::prompt("rust lifetimes");
        assert!(prompt.contains("\"rust lifetimes\""));
        assert!(prompt.contains("1. Generate a detailed explanation."));
        assert!(prompt.contains("4. Ask for clarification if the input is unclear."));
        assert!(prompt.ends_with("Return only the number of the chosen action."));
    }

    #[tokio::test]
    async fn test_decide_valid_reply() {
        let service = ScriptedService::sequence(vec![Step::ok("3")]);
        let decision = DecisionStep::new("m").decide(&service, "what is 2+2?").await;
        assert_eq!(decision.action, Action::AnswerQuestion);
        assert!(!decision.is_fallback());

        let request = &service.requests()[0];
        assert_eq!(request.temperature, 0.3);
        assert!(request.system_prompt.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_reply_falls_back_to_clarify() {
        let service = ScriptedService::sequence(vec![Step::ok("7")]);
        let decision = DecisionStep::new("m").decide(&service, "hmm").await;
        assert_eq!(decision.action, Action::Clarify);
        assert!(matches!(
            decision.error,
            Some(ClassificationError::OutOfRange { value: 7, .. })
        ));
        assert_eq!(decision.reply.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_non_numeric_reply_falls_back_to_clarify() {
        let service = ScriptedService::sequence(vec![Step::ok("I think an explanation")]);
        let decision = DecisionStep::new("m").decide(&service, "hmm").await;
        assert_eq!(decision.action, Action::Clarify);
        assert!(matches!(
            decision.error,
            Some(ClassificationError::Unparseable { .. })
        ));
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_clarify() {
        let service = ScriptedService::sequence(vec![Step::err(ServiceError::auth("nope"))]);
        let decision = DecisionStep::new("m").decide(&service, "hmm").await;
        assert_eq!(decision.action, Action::Clarify);
        assert!(matches!(decision.error, Some(ClassificationError::Service(_))));
        assert!(decision.reply.is_none());
    }
}

//! Completion service boundary.
//!
//! Everything that talks to a text-generation provider goes through
//! [`CompletionService`]. The HTTP client is passed in explicitly; there
//! is no process-wide client or key.

mod echo;
mod openai;

#[cfg(test)]
pub(crate) mod testing;

pub use echo::EchoService;
pub use openai::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL};

use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            model: model.into(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
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
}

/// External text-generation call: prompt in, generated text or error out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

pub type DynCompletionService = Arc<dyn CompletionService>;

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        (**self).complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("gpt-4", "hello")
            .with_system("be brief")
            .with_temperature(0.3)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }
}

//! OpenAI-compatible chat completions client.

use super::{CompletionRequest, CompletionService};
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP completion client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ServiceError::auth("no API key configured"))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        if !request.user_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "user",
                content: &request.user_prompt,
            });
        }
        if messages.is_empty() {
            return Err(ServiceError::invalid_request("request has no messages"));
        }

        let body = ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
        };

        debug!(
            "POST {} model={} messages={}",
            self.endpoint(),
            request.model,
            body.messages.len()
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, request))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::network(format!("failed to parse response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::network("response contained no message content"))
    }
}

fn map_transport_error(e: reqwest::Error, request: &CompletionRequest) -> ServiceError {
    if e.is_timeout() {
        ServiceError::timeout(format!(
            "request timed out after {}s",
            request.timeout.as_secs_f64()
        ))
    } else if e.is_connect() {
        ServiceError::network(format!("cannot connect: {}", e))
    } else {
        ServiceError::network(format!("failed to send request: {}", e))
    }
}

fn map_status(status: StatusCode, body: &str) -> ServiceError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let message = format!("API error {}: {}", status.as_u16(), detail);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::auth(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT => ServiceError::timeout(message),
        s if s.is_server_error() => ServiceError::network(message),
        _ => ServiceError::invalid_request(message),
    }
}

use super::{CompletionRequest, CompletionService};
use crate::error::ServiceError;
use async_trait::async_trait;

/// Offline service that echoes the prompt back. Used with `--offline`.
#[derive(Debug, Default, Clone)]
pub struct EchoService;

#[async_trait]
impl CompletionService for EchoService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let prompt = if request.user_prompt.trim().is_empty() {
            request.system_prompt.as_deref().unwrap_or_default()
        } else {
            request.user_prompt.as_str()
        };
        let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        Ok(format!("[echo:{}] {}", request.model, first_line.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_uses_first_prompt_line() {
        let request = CompletionRequest::new("offline", "").with_system("\nAnalyze Acme:\n- x");
        let reply = EchoService.complete(&request).await.unwrap();
        assert_eq!(reply, "[echo:offline] Analyze Acme:");
    }

    #[test]
    fn test_echo_prefers_user_prompt() {
        let request = CompletionRequest::new("m", "Explain tides.").with_system("system text");
        let reply = tokio_test::block_on(EchoService.complete(&request));
        let reply = tokio_test::assert_ok!(reply);
        assert_eq!(reply, "[echo:m] Explain tides.");
    }
}

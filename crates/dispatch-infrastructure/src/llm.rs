//! LLM provider client (C7's collaborator): a thin HTTP adapter over a
//! chat-completions-style endpoint.
//!
//! `original_source/src/llm_executor/llm_service/api.py` fronts the actual
//! program-synthesis model behind its own FastAPI process; the retrieval
//! pack's copy of that file is import declarations only; it contributes no
//! request/response shape to ground against. The `LlmProvider` port is
//! already defined as a plain text-in/text-out oracle
//! (`dispatch-domain::ports::LlmProvider`), so this adapter is authored
//! directly against that contract, using `mcb-domain`'s
//! `HttpClientProvider`/`HttpClientConfig` pattern for client
//! construction (pooled client, configurable timeout, explicit user
//! agent) and a minimal OpenAI-compatible chat-completions body, the
//! de-facto wire format for hosted and self-hosted code-generation models
//! alike.

use async_trait::async_trait;
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::LlmProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a Python code generator. Respond with only the Python source needed to accomplish the task, no explanation, no markdown fences.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// `LlmProvider` backed by an HTTP chat-completions endpoint.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpLlmProvider {
    /// `endpoint` is the base URL (e.g. `http://localhost:8080`); requests
    /// are posted to `{endpoint}/v1/chat/completions`. `api_key` is sent
    /// as a bearer token when non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be
    /// built (e.g. an invalid TLS configuration).
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("dispatch-engine/llm-client")
            .build()
            .map_err(|e| Error::network_with_source("failed to build LLM HTTP client", e))?;

        Ok(Self { client, endpoint: endpoint.into(), api_key: api_key.into(), model: model.into() })
    }

    async fn complete(&self, messages: Vec<ChatMessage<'_>>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = ChatCompletionRequest { model: &self.model, messages };

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| Error::network_with_source("LLM provider request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::network(format!("LLM provider returned {status}: {text}")));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| Error::network_with_source("failed to decode LLM provider response", e))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::network("LLM provider returned no completion choices"))?
            .message
            .content;

        Ok(strip_code_fences(&content))
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn generate(&self, task: &str) -> Result<String> {
        self.complete(vec![
            ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
            ChatMessage { role: "user", content: task.to_string() },
        ])
        .await
    }

    async fn correct(&self, previous_code: &str, feedback: &str) -> Result<String> {
        let prompt = format!(
            "The following Python program was rejected:\n\n{previous_code}\n\nReason(s):\n{feedback}\n\nProduce a corrected version that addresses every reason above."
        );
        self.complete(vec![
            ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
            ChatMessage { role: "user", content: prompt },
        ])
        .await
    }
}

/// Strip a single leading/trailing ```` ```python ```` / ```` ``` ```` fence,
/// since chat models routinely wrap code in markdown even when told not to.
fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    let Some(without_leading) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let without_leading = without_leading.strip_prefix("python").unwrap_or(without_leading);
    let without_leading = without_leading.trim_start_matches('\n');
    match without_leading.strip_suffix("```") {
        Some(without_trailing) => without_trailing.trim().to_string(),
        None => without_leading.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fences_removes_python_fence() {
        let content = "```python\nprint('hi')\n```";
        assert_eq!(strip_code_fences(content), "print('hi')");
    }

    #[test]
    fn strip_code_fences_removes_bare_fence() {
        let content = "```\nprint('hi')\n```";
        assert_eq!(strip_code_fences(content), "print('hi')");
    }

    #[test]
    fn strip_code_fences_is_a_no_op_without_fences() {
        let content = "print('hi')";
        assert_eq!(strip_code_fences(content), "print('hi')");
    }

    #[tokio::test]
    async fn generate_sends_the_task_as_the_user_message_and_returns_the_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"print(1)"}}]}"#)
            .create_async()
            .await;

        let provider = HttpLlmProvider::new(server.url(), "", "gpt-4", Duration::from_secs(5)).unwrap();
        let code = provider.generate("print one").await.unwrap();

        assert_eq!(code, "print(1)");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn a_non_success_status_becomes_a_network_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/chat/completions").with_status(500).create_async().await;

        let provider = HttpLlmProvider::new(server.url(), "", "gpt-4", Duration::from_secs(5)).unwrap();
        let result = provider.generate("print one").await;

        assert!(result.is_err());
    }
}

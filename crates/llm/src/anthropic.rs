//! Anthropic Messages API backend.

use async_trait::async_trait;
use pipeline::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelName, ServiceError, TokenCount,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::retry::{with_retry, BASE_DELAY};
use crate::{LlmConfig, LlmError};

const API_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.content_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Sends completions to `POST {base_url}/v1/messages`.
#[derive(Debug)]
pub struct AnthropicProvider {
    http: Client,
    api_key: String,
    base_url: String,
    model: ModelName,
    temperature: Option<f32>,
    transport_retries: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: ModelName,
        config: &LlmConfig,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
            transport_retries: config.transport_retries,
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: self.model.as_str(),
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            system: request.system.as_deref(),
            temperature: request.temperature.or(self.temperature),
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(LlmError::RateLimited { retry_after });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::Api { status, message });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))?;
        let text = parsed
            .text()
            .ok_or_else(|| LlmError::InvalidResponse("response has no text block".into()))?
            .to_string();

        Ok(CompletionResponse {
            text,
            model: parsed.model,
            input_tokens: TokenCount::new(parsed.usage.input_tokens),
            output_tokens: TokenCount::new(parsed.usage.output_tokens),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        let response = with_retry(self.transport_retries, BASE_DELAY, || self.send(request)).await?;
        tracing::debug!(
            provider = "claude",
            model = %response.model,
            input_tokens = %response.input_tokens,
            output_tokens = %response.output_tokens,
            "completion received"
        );
        Ok(response)
    }

    fn name(&self) -> &str {
        "claude"
    }

    fn model(&self) -> &ModelName {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderKind;

    fn provider(base_url: String) -> AnthropicProvider {
        let config = LlmConfig {
            provider: ProviderKind::Claude,
            transport_retries: 0,
            ..LlmConfig::default()
        };
        AnthropicProvider::new(
            "test-key".into(),
            base_url,
            ModelName::new("claude-test").unwrap(),
            &config,
        )
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: Some("You write Python.".into()),
            prompt: "add two numbers".into(),
            max_tokens: 512,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn completes_with_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "msg_1",
                    "model": "claude-test",
                    "content": [{"type": "text", "text": "```python\nx = 1\n```"}],
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 12, "output_tokens": 7}
                }"#,
            )
            .create_async()
            .await;

        let response = provider(server.url()).complete(&request()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.text, "```python\nx = 1\n```");
        assert_eq!(response.input_tokens.as_u64(), 12);
        assert_eq!(response.output_tokens.as_u64(), 7);
    }

    #[tokio::test]
    async fn rate_limit_becomes_transport_fault() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_header("retry-after", "1")
            .create_async()
            .await;

        let err = provider(server.url()).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport { ref message } if message.contains("rate limited")));
    }

    #[tokio::test]
    async fn bad_key_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .create_async()
            .await;

        let err = provider(server.url()).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { .. }));
    }
}

//! Ollama backend over its OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use pipeline::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelName, ServiceError, TokenCount,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::retry::{with_retry, BASE_DELAY};
use crate::{LlmConfig, LlmError};

/// Ollama ignores the bearer token but OpenAI-compatible clients must send one.
const PLACEHOLDER_API_KEY: &str = "ollama";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Sends completions to `POST {base_url}/chat/completions`.
#[derive(Debug)]
pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: ModelName,
    temperature: Option<f32>,
    transport_retries: u32,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: ModelName, config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
            transport_retries: config.transport_retries,
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        let body = ChatRequest {
            model: self.model.as_str(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature.or(self.temperature),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(PLACEHOLDER_API_KEY)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(LlmError::RateLimited { retry_after: None });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::Api { status, message });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".into()))?;
        let (input, output) = parsed
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            model: parsed.model.unwrap_or_else(|| self.model.to_string()),
            input_tokens: TokenCount::new(input),
            output_tokens: TokenCount::new(output),
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        let response = with_retry(self.transport_retries, BASE_DELAY, || self.send(request)).await?;
        tracing::debug!(
            provider = "ollama",
            model = %response.model,
            input_tokens = %response.input_tokens,
            output_tokens = %response.output_tokens,
            "completion received"
        );
        Ok(response)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &ModelName {
        &self.model
    }
}

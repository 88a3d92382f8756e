use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    CodeGenerator, CompletionRequest, GenerationRequest, GenerationResponse, LlmProvider,
    ServiceError,
};

use super::extract::{extract_code, extract_dependencies, extract_explanation};
use super::AgentSettings;
use crate::AgentError;

const SYSTEM_PROMPT: &str = "\
You are a senior Python engineer. Write clean, working, PEP 8 compliant Python 3 code.

Rules:
- Return the complete program in a single ```python fenced block.
- Import everything you use. Only import modules from the standard library or \
well-known packages on PyPI; never invent modules or functions.
- Include docstrings, type hints, and error handling.
- Never leave placeholders, TODOs, or `pass` bodies where logic belongs.

After the code, add a `## Explanation` section with a short description and a \
`## Dependencies` section listing third-party packages (or `None`).";

/// Generates candidate code by prompting an LLM.
pub struct LlmCodeGenerator {
    provider: Arc<dyn LlmProvider>,
    settings: AgentSettings,
}

impl LlmCodeGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: AgentSettings) -> Result<Self, AgentError> {
        settings.validate()?;
        Ok(Self { provider, settings })
    }

    fn prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Generate Python code for the following request:\n\n{}\n\n",
            request.request
        );
        if !request.constraints.is_empty() {
            prompt.push_str(&format!("Constraints: {}\n\n", request.constraints.join(", ")));
        }
        if let Some(feedback) = &request.feedback {
            prompt.push_str(&format!("\n### Previous Attempt Issues:\n{feedback}\n\n"));
            if let Some(previous) = &request.previous_attempt {
                prompt.push_str(&format!("### Previous Code:\n```python\n{previous}\n```\n\n"));
            }
            prompt.push_str("Please fix the issues and generate corrected code.\n");
        }
        prompt.push_str(
            "\nProvide only the Python code within ```python code blocks. \
             Include all imports, docstrings, type hints, and error handling.",
        );
        prompt
    }
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        let completion = self
            .provider
            .complete(&CompletionRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                prompt: Self::prompt(request),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await?;

        let reply = completion.text;
        let Some(code) = extract_code(&reply) else {
            tracing::debug!(reply_chars = reply.len(), "model reply had no code block");
            return Ok(GenerationResponse::Error {
                error: "No code block found in response".into(),
                raw_response: Some(reply),
            });
        };

        Ok(GenerationResponse::Success {
            code,
            explanation: extract_explanation(&reply),
            dependencies: extract_dependencies(&reply),
        })
    }
}

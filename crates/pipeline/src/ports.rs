//! Port traits: what the pipeline needs from the outside world.
//!
//! Infrastructure crates implement these; the stage runners in `nodes` only
//! ever see `dyn` trait objects, chosen once at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    GenerationRequest, GenerationResponse, ModelName, ReferenceReport, ReviewReport,
    ServiceError, SyntaxReport, TokenCount,
};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Produces candidate code for a request.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Produce one candidate.
    ///
    /// `Ok(GenerationResponse::Error { .. })` is a semantic failure (e.g. no
    /// code block in the model output); `Err` is a collaborator fault.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError>;
}

/// Parses candidate code and reports syntax problems.
#[async_trait]
pub trait SyntaxValidator: Send + Sync {
    async fn validate(
        &self,
        code: &str,
        context: Option<&str>,
    ) -> Result<SyntaxReport, ServiceError>;
}

/// Checks that every module the code imports really exists.
#[async_trait]
pub trait ReferenceVerifier: Send + Sync {
    async fn verify(&self, code: &str) -> Result<ReferenceReport, ServiceError>;
}

/// Produces a non-blocking quality assessment of accepted code.
#[async_trait]
pub trait CodeReviewer: Send + Sync {
    async fn review(&self, code: &str, requirements: &str) -> Result<ReviewReport, ServiceError>;
}

// ---------------------------------------------------------------------------
// LLM provider
// ---------------------------------------------------------------------------

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// The text a provider returned, plus usage accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
    #[serde(default)]
    pub input_tokens: TokenCount,
    #[serde(default)]
    pub output_tokens: TokenCount,
}

/// A backend capable of answering a [`CompletionRequest`].
///
/// The generator and reviewer agents hold an `Arc<dyn LlmProvider>`; which
/// backend sits behind it is decided once by configuration.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ServiceError>;

    /// Short backend name for logging (`"claude"`, `"ollama"`).
    fn name(&self) -> &str;

    /// Model requests are sent to.
    fn model(&self) -> &ModelName;
}

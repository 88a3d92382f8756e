//! Codesmith LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::LlmProvider`] trait for two interchangeable
//! backends:
//!
//! - [`AnthropicProvider`]: Anthropic's Messages API.
//! - [`OllamaProvider`]: a local Ollama server through its OpenAI-compatible
//!   chat completions endpoint.
//!
//! [`build_provider`] picks one from [`LlmConfig`] exactly once; nothing
//! downstream branches on the backend again.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response parsing,
//! rate-limit handling, and exponential back-off live here. The [`pipeline`]
//! crate sees only [`pipeline::LlmProvider`] and [`pipeline::ServiceError`].

mod anthropic;
mod config;
mod error;
mod ollama;
pub mod retry;

pub use anthropic::AnthropicProvider;
pub use config::{
    build_provider, LlmConfig, ProviderKind, DEFAULT_ANTHROPIC_URL, DEFAULT_CLAUDE_MODEL,
    DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL,
};
pub use error::LlmError;
pub use ollama::OllamaProvider;

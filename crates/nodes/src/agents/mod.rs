//! Collaborators that are a prompt and a parser over an [`pipeline::LlmProvider`].
//!
//! Neither agent knows which backend it talks to; the provider is injected
//! once by the composition root.

mod extract;
mod generator;
mod reviewer;

pub use generator::LlmCodeGenerator;
pub use reviewer::LlmCodeReviewer;

/// Completion parameters shared by both agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSettings {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

impl AgentSettings {
    fn validate(&self) -> Result<(), crate::AgentError> {
        if self.max_tokens == 0 {
            return Err(crate::AgentError::Settings(
                "max_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

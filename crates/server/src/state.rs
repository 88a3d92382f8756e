use std::sync::Arc;

use nodes::PipelineExecutor;
use pipeline::{ReferenceVerifier, SyntaxValidator};
use serde::Serialize;

/// What `/api/health` and `/api/config` report about the LLM backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub base_url: String,
}

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    executor: Arc<PipelineExecutor>,
    syntax: Arc<dyn SyntaxValidator>,
    references: Arc<dyn ReferenceVerifier>,
    provider: Arc<ProviderInfo>,
}

impl AppState {
    /// `syntax` and `references` should be the same checkers the executor
    /// was built with, so `/api/test-agents` probes what runs actually use.
    pub fn new(
        executor: Arc<PipelineExecutor>,
        syntax: Arc<dyn SyntaxValidator>,
        references: Arc<dyn ReferenceVerifier>,
        provider: ProviderInfo,
    ) -> Self {
        Self {
            executor,
            syntax,
            references,
            provider: Arc::new(provider),
        }
    }

    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    pub fn syntax(&self) -> &dyn SyntaxValidator {
        self.syntax.as_ref()
    }

    pub fn references(&self) -> &dyn ReferenceVerifier {
        self.references.as_ref()
    }

    pub fn provider(&self) -> &ProviderInfo {
        &self.provider
    }
}

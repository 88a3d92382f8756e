//! `codesmith.toml` loading and environment overrides.

use std::net::SocketAddr;
use std::path::Path;

use analysis::AnalysisConfig;
use anyhow::Context;
use llm::{LlmConfig, ProviderKind};
use pipeline::{PipelineConfig, PipelineError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "codesmith.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// OTLP gRPC collector, e.g. `http://localhost:4317`. Export is off when unset.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "codesmith".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Reads `path`, applies process environment overrides, and validates.
    ///
    /// A missing file is only an error when `required` is set; otherwise the
    /// defaults are used.
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        Self::load_with(path, required, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an injectable environment.
    pub fn load_with(
        path: &Path,
        required: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read {}", path.display()));
            }
        };
        config.apply_env(lookup)?;
        config
            .llm
            .fit_within(config.pipeline.collaborator_timeout());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Overrides from `LLM_PROVIDER`, `ANTHROPIC_API_KEY`, `CLAUDE_MODEL`,
    /// `OLLAMA_MODEL`, `OLLAMA_BASE_URL`, and `PORT`. Model and URL
    /// variables only apply to the provider they name.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), PipelineError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let invalid = |message: String| PipelineError::Configuration { message };

        if let Some(provider) = var("LLM_PROVIDER") {
            self.llm.provider = provider
                .parse::<ProviderKind>()
                .map_err(|e| invalid(format!("LLM_PROVIDER: {e}")))?;
        }
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.llm.api_key = Some(key);
        }
        match self.llm.provider {
            ProviderKind::Claude => {
                if let Some(model) = var("CLAUDE_MODEL") {
                    self.llm.model = Some(model);
                }
            }
            ProviderKind::Ollama => {
                if let Some(model) = var("OLLAMA_MODEL") {
                    self.llm.model = Some(model);
                }
                if let Some(url) = var("OLLAMA_BASE_URL") {
                    self.llm.base_url = Some(url);
                }
            }
        }
        if let Some(port) = var("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| invalid(format!("PORT '{port}': {e}")))?;
            self.server.bind.set_port(port);
        }
        Ok(())
    }

    /// Validates each section, then checks that a provider call with all its
    /// transport retries ends before the pipeline's collaborator timeout.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.pipeline.validate()?;
        self.llm
            .validate()
            .map_err(|e| PipelineError::Configuration {
                message: e.to_string(),
            })?;

        let budget = self.pipeline.collaborator_timeout();
        let mut llm = self.llm.clone();
        llm.fit_within(budget);
        let call = llm.worst_case_call();
        if call > budget {
            return Err(PipelineError::Configuration {
                message: format!(
                    "llm.request_timeout_secs with {} transport retries can take {}s, \
                     longer than pipeline.collaborator_timeout_secs ({}s)",
                    self.llm.transport_retries,
                    call.as_secs(),
                    budget.as_secs()
                ),
            });
        }
        Ok(())
    }
}

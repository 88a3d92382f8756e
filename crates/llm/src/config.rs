//! The `[llm]` configuration section and provider construction.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{LlmProvider, ModelName};
use serde::{Deserialize, Serialize};

use crate::retry::BASE_DELAY;
use crate::{AnthropicProvider, LlmError, OllamaProvider};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-coder:6.7b";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Which backend answers completion requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    #[default]
    Ollama,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "ollama" => Ok(Self::Ollama),
            other => Err(LlmError::Configuration(format!(
                "unknown LLM provider '{other}' (expected 'claude' or 'ollama')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    /// Required for `claude`; ignored by `ollama`.
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Extra sends per call for retryable transport failures.
    pub transport_retries: u32,
    /// Per-send HTTP timeout. When unset, [`LlmConfig::fit_within`] derives it
    /// from the pipeline's collaborator timeout.
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: 4096,
            temperature: Some(0.7),
            transport_retries: 2,
            request_timeout_secs: None,
        }
    }
}

impl LlmConfig {
    /// The model requests will go to, after defaults are applied.
    pub fn resolved_model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) if !model.trim().is_empty() => model,
            (_, ProviderKind::Claude) => DEFAULT_CLAUDE_MODEL,
            (_, ProviderKind::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    /// The endpoint requests will go to, after defaults are applied.
    pub fn resolved_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) if !url.trim().is_empty() => url.trim_end_matches('/'),
            (_, ProviderKind::Claude) => DEFAULT_ANTHROPIC_URL,
            (_, ProviderKind::Ollama) => DEFAULT_OLLAMA_URL,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Total back-off slept between sends when every retry is used.
    fn total_backoff(&self) -> Duration {
        (0..self.transport_retries).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt)))
        })
    }

    /// Wall time of one provider call when every send times out. Server
    /// `Retry-After` hints are not included.
    pub fn worst_case_call(&self) -> Duration {
        self.request_timeout()
            .saturating_mul(self.transport_retries.saturating_add(1))
            .saturating_add(self.total_backoff())
    }

    /// Sets an unset per-send timeout so that every send and back-off of one
    /// call fits inside `call_budget`. Never goes below one second.
    pub fn fit_within(&mut self, call_budget: Duration) {
        if self.request_timeout_secs.is_some() {
            return;
        }
        let sends = self.transport_retries.saturating_add(1);
        let per_send = call_budget.saturating_sub(self.total_backoff()) / sends;
        self.request_timeout_secs = Some(per_send.as_secs().max(1));
    }

    pub fn validate(&self) -> Result<(), LlmError> {
        if self.max_tokens == 0 {
            return Err(LlmError::Configuration("llm.max_tokens must be at least 1".into()));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(LlmError::Configuration(format!(
                    "llm.temperature {t} is outside 0.0-2.0"
                )));
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(LlmError::Configuration(
                "llm.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builds the configured backend. Called once by the composition root.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    config.validate()?;
    let model = ModelName::new(config.resolved_model())
        .ok_or_else(|| LlmError::Configuration("llm.model must not be blank".into()))?;

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Claude => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| LlmError::MissingApiKey("ANTHROPIC_API_KEY not set".into()))?;
            Arc::new(AnthropicProvider::new(
                api_key,
                config.resolved_base_url().to_string(),
                model,
                config,
            )?)
        }
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            config.resolved_base_url().to_string(),
            model,
            config,
        )?),
    };

    tracing::info!(
        provider = provider.name(),
        model = %provider.model(),
        "LLM provider configured"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_provider() {
        let ollama = LlmConfig::default();
        assert_eq!(ollama.resolved_model(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(ollama.resolved_base_url(), DEFAULT_OLLAMA_URL);

        let claude = LlmConfig {
            provider: ProviderKind::Claude,
            ..LlmConfig::default()
        };
        assert_eq!(claude.resolved_model(), DEFAULT_CLAUDE_MODEL);
        assert_eq!(claude.resolved_base_url(), DEFAULT_ANTHROPIC_URL);
    }

    #[test]
    fn explicit_values_win() {
        let config = LlmConfig {
            model: Some("qwen2.5-coder".into()),
            base_url: Some("http://gpu-box:11434/v1/".into()),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolved_model(), "qwen2.5-coder");
        assert_eq!(config.resolved_base_url(), "http://gpu-box:11434/v1");
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("gpt".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn claude_requires_api_key() {
        let config = LlmConfig {
            provider: ProviderKind::Claude,
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_provider(&config),
            Err(LlmError::MissingApiKey(_))
        ));
    }

    #[test]
    fn ollama_builds_without_key() {
        let provider = build_provider(&LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model().as_str(), DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn unset_timeout_is_fitted_to_call_budget() {
        let mut config = LlmConfig::default();
        config.fit_within(Duration::from_secs(120));
        // 1s + 2s of back-off, then three sends share the remaining 117s.
        assert_eq!(config.request_timeout_secs, Some(39));
        assert_eq!(config.worst_case_call(), Duration::from_secs(120));
    }

    #[test]
    fn explicit_timeout_is_kept() {
        let mut config = LlmConfig {
            request_timeout_secs: Some(90),
            ..LlmConfig::default()
        };
        config.fit_within(Duration::from_secs(120));
        assert_eq!(config.request_timeout_secs, Some(90));
        assert_eq!(config.worst_case_call(), Duration::from_secs(273));
    }

    #[test]
    fn tiny_budget_still_allows_one_second_sends() {
        let mut config = LlmConfig {
            transport_retries: 0,
            ..LlmConfig::default()
        };
        config.fit_within(Duration::from_millis(300));
        assert_eq!(config.request_timeout_secs, Some(1));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = LlmConfig {
            temperature: Some(3.5),
            ..LlmConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

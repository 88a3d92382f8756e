//! Budgets and limits that govern a pipeline run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contracts::DEFAULT_CONSTRAINTS;
use crate::PipelineError;

pub const MAX_GENERATION_RETRIES: u32 = 3;
pub const MAX_SYNTAX_RETRIES: u32 = 3;
pub const MAX_HALLUCINATION_RETRIES: u32 = 3;
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_STATE_RETENTION_LIMIT: usize = 1024;

/// The `[pipeline]` configuration section.
///
/// Local budgets apply per stage invocation. Because the syntax and reference
/// stages re-enter generation with a fresh local budget, the worst case number
/// of generation attempts for one run is
/// `G + S * G + H * G` (21 with the defaults). Set
/// `max_total_generation_attempts` to put a hard cap on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub max_generation_retries: u32,
    pub max_syntax_retries: u32,
    pub max_hallucination_retries: u32,
    /// Run-wide cap on generation attempts, checked before every attempt.
    pub max_total_generation_attempts: Option<u32>,
    /// Upper bound on a single collaborator call.
    pub collaborator_timeout_secs: u64,
    /// How many finished request snapshots to keep for lookup.
    pub state_retention_limit: usize,
    /// Whether runs include the review stage unless told otherwise.
    pub enable_review: bool,
    pub constraints: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_generation_retries: MAX_GENERATION_RETRIES,
            max_syntax_retries: MAX_SYNTAX_RETRIES,
            max_hallucination_retries: MAX_HALLUCINATION_RETRIES,
            max_total_generation_attempts: None,
            collaborator_timeout_secs: DEFAULT_COLLABORATOR_TIMEOUT_SECS,
            state_retention_limit: DEFAULT_STATE_RETENTION_LIMIT,
            enable_review: true,
            constraints: DEFAULT_CONSTRAINTS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Rejects budgets that would make a stage unable to run at all.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let budgets = [
            ("max_generation_retries", self.max_generation_retries),
            ("max_syntax_retries", self.max_syntax_retries),
            ("max_hallucination_retries", self.max_hallucination_retries),
        ];
        for (key, value) in budgets {
            if value == 0 {
                return Err(PipelineError::Configuration {
                    message: format!("pipeline.{key} must be at least 1"),
                });
            }
        }
        if self.max_total_generation_attempts == Some(0) {
            return Err(PipelineError::Configuration {
                message: "pipeline.max_total_generation_attempts must be at least 1 when set"
                    .into(),
            });
        }
        if self.collaborator_timeout_secs == 0 {
            return Err(PipelineError::Configuration {
                message: "pipeline.collaborator_timeout_secs must be at least 1".into(),
            });
        }
        if self.state_retention_limit == 0 {
            return Err(PipelineError::Configuration {
                message: "pipeline.state_retention_limit must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Generation attempts one run can make when no global cap is set.
    /// Saturates at `u32::MAX`.
    pub fn worst_case_generation_attempts(&self) -> u32 {
        let g = self.max_generation_retries;
        g.saturating_add(self.max_syntax_retries.saturating_mul(g))
            .saturating_add(self.max_hallucination_retries.saturating_mul(g))
    }
}

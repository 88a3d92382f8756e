//! Probe the validation collaborators with known-good input.

use pipeline::{ReferenceVerifier, SyntaxValidator};
use serde::{Deserialize, Serialize};
use tracing::warn;

const SYNTAX_PROBE: &str = "def add(a, b):\n    return a + b";
const REFERENCE_PROBE: &str = "import os\nimport json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Working,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHealth {
    pub status: HealthStatus,
}

impl AgentHealth {
    fn from_ok(ok: bool) -> Self {
        Self {
            status: if ok {
                HealthStatus::Working
            } else {
                HealthStatus::Error
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub syntax_checker: AgentHealth,
    pub hallucination_detector: AgentHealth,
}

impl SelfTestReport {
    pub fn all_working(&self) -> bool {
        self.syntax_checker.status == HealthStatus::Working
            && self.hallucination_detector.status == HealthStatus::Working
    }
}

/// Run each validator once against input it must accept.
///
/// A fault or a rejection both count as `error`.
pub async fn self_test(
    syntax: &dyn SyntaxValidator,
    references: &dyn ReferenceVerifier,
) -> SelfTestReport {
    let syntax_ok = match syntax.validate(SYNTAX_PROBE, None).await {
        Ok(report) => report.is_valid(),
        Err(e) => {
            warn!(error = %e, "Syntax validator self-test failed");
            false
        }
    };
    let references_ok = match references.verify(REFERENCE_PROBE).await {
        Ok(report) => report.is_verified(),
        Err(e) => {
            warn!(error = %e, "Reference verifier self-test failed");
            false
        }
    };
    SelfTestReport {
        syntax_checker: AgentHealth::from_ok(syntax_ok),
        hallucination_detector: AgentHealth::from_ok(references_ok),
    }
}

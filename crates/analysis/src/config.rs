use serde::{Deserialize, Serialize};

/// The `[analysis]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Top-level module names to accept in addition to the built-in tables,
    /// e.g. internal packages available in the target environment.
    pub extra_known_modules: Vec<String>,
}

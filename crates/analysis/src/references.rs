//! Import verification: every module the code pulls in must be known.

use std::collections::BTreeSet;

use async_trait::async_trait;
use pipeline::{
    Hallucination, ReferenceReport, ReferenceVerifier, RiskAssessment, RiskSeverity,
    ServiceError, VerifiedComponent,
};
use tracing::debug;
use tree_sitter::Node;

use crate::{modules, python, AnalysisConfig};

const STDLIB_SOURCE: &str = "Python Standard Library";
const THIRD_PARTY_SOURCE: &str = "Known Third-Party Library";
const CONFIGURED_SOURCE: &str = "Configured Module";
const LOCAL_SOURCE: &str = "Local Module";

/// One module referenced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Import {
    module: String,
    line: u32,
    relative: bool,
}

impl Import {
    fn new(module: &str, node: &Node<'_>, relative: bool) -> Self {
        Self {
            module: module.to_string(),
            line: u32::try_from(node.start_position().row + 1).unwrap_or(u32::MAX),
            relative,
        }
    }

    fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or_default()
    }
}

fn collect_imports(code: &str, root: Node<'_>) -> Vec<Import> {
    let mut imports = Vec::new();
    python::walk(root, |node| {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    // `import numpy as np` names the aliased_import node.
                    let dotted = name.child_by_field_name("name").unwrap_or(name);
                    imports.push(Import::new(python::node_text(&dotted, code), &node, false));
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    let relative = module.kind() == "relative_import";
                    imports.push(Import::new(python::node_text(&module, code), &node, relative));
                }
            }
            "future_import_statement" => {
                imports.push(Import::new("__future__", &node, false));
            }
            _ => {}
        }
        true
    });
    imports
}

fn assess_risk(count: usize) -> RiskAssessment {
    let (severity, impact) = match count {
        0 => (RiskSeverity::Low, "Code may fail at import"),
        1 | 2 => (RiskSeverity::Medium, "Code will fail at import or runtime"),
        _ => (
            RiskSeverity::High,
            "Multiple non-existent components will cause immediate failure",
        ),
    };
    RiskAssessment {
        severity,
        impact: impact.to_string(),
        hallucination_count: count,
    }
}

// ---------------------------------------------------------------------------
// ReferenceChecker
// ---------------------------------------------------------------------------

/// Flags imports of modules that do not exist.
///
/// A module is accepted when its top-level package is in the standard
/// library table, the known third-party table, or `extra_known_modules`.
/// Relative imports always resolve to the local project.
#[derive(Debug, Clone, Default)]
pub struct ReferenceChecker {
    extra: BTreeSet<String>,
}

impl ReferenceChecker {
    pub fn new<I, S>(extra_known_modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra_known_modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.extra_known_modules.iter().cloned())
    }

    fn source_of(&self, import: &Import) -> Option<&'static str> {
        let top = import.top_level();
        if import.relative {
            Some(LOCAL_SOURCE)
        } else if modules::is_stdlib(top) {
            Some(STDLIB_SOURCE)
        } else if modules::is_known_third_party(top) {
            Some(THIRD_PARTY_SOURCE)
        } else if self.extra.contains(top) {
            Some(CONFIGURED_SOURCE)
        } else {
            None
        }
    }

    pub fn check(&self, code: &str) -> ReferenceReport {
        if code.trim().is_empty() {
            return ReferenceReport::Failed {
                message: "Empty code provided".into(),
            };
        }

        let tree = match python::parse(code) {
            Ok(tree) => tree,
            Err(e) => {
                return ReferenceReport::Failed {
                    message: format!("Verification failed: {e}"),
                }
            }
        };
        let root = tree.root_node();
        if root.has_error() {
            let line = python::first_error(root).map_or(0, |n| n.start_position().row + 1);
            return ReferenceReport::Failed {
                message: format!(
                    "Cannot verify code with syntax errors (first error on line {line})"
                ),
            };
        }

        let mut verified_components = Vec::new();
        let mut hallucinations = Vec::new();
        for import in collect_imports(code, root) {
            match self.source_of(&import) {
                Some(source) => verified_components.push(VerifiedComponent {
                    component: import.module,
                    source: source.to_string(),
                }),
                None => hallucinations.push(Hallucination {
                    line: import.line,
                    kind: "Library".into(),
                    issue: format!(
                        "Module '{}' does not exist or is not installed",
                        import.module
                    ),
                    suggestion: Some(modules::suggest(&import.module)),
                    referenced: import.module,
                }),
            }
        }

        if hallucinations.is_empty() {
            return ReferenceReport::Verified {
                verified_components,
            };
        }

        debug!(count = hallucinations.len(), "Unknown modules referenced");
        ReferenceReport::Detected {
            risk: Some(assess_risk(hallucinations.len())),
            hallucinations,
            verified_components,
        }
    }
}

#[async_trait]
impl ReferenceVerifier for ReferenceChecker {
    async fn verify(&self, code: &str) -> Result<ReferenceReport, ServiceError> {
        Ok(self.check(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(report: &ReferenceReport) -> Vec<(&str, &str)> {
        let components = match report {
            ReferenceReport::Verified {
                verified_components,
            }
            | ReferenceReport::Detected {
                verified_components,
                ..
            } => verified_components,
            ReferenceReport::Failed { .. } => return Vec::new(),
        };
        components
            .iter()
            .map(|c| (c.component.as_str(), c.source.as_str()))
            .collect()
    }

    #[test]
    fn known_modules_verify() {
        let code = "import os.path\nimport numpy as np\nfrom PIL import Image\n";
        let report = ReferenceChecker::default().check(code);

        assert!(report.is_verified());
        assert_eq!(
            sources(&report),
            [
                ("os.path", STDLIB_SOURCE),
                ("numpy", THIRD_PARTY_SOURCE),
                ("PIL", THIRD_PARTY_SOURCE),
            ]
        );
    }

    #[test]
    fn relative_and_future_imports_resolve() {
        let code = "from __future__ import annotations\nfrom . import helpers\nfrom .utils import load\n";
        let report = ReferenceChecker::default().check(code);

        assert!(report.is_verified());
        assert_eq!(
            sources(&report),
            [
                ("__future__", STDLIB_SOURCE),
                (".", LOCAL_SOURCE),
                (".utils", LOCAL_SOURCE),
            ]
        );
    }

    #[test]
    fn unknown_module_is_a_hallucination() {
        let code = "import json\nimport automagic_parser\n";
        let report = ReferenceChecker::default().check(code);

        let ReferenceReport::Detected {
            hallucinations,
            risk,
            ..
        } = &report
        else {
            panic!("expected detection");
        };
        assert_eq!(hallucinations.len(), 1);
        assert_eq!(hallucinations[0].line, 2);
        assert_eq!(hallucinations[0].kind, "Library");
        assert_eq!(hallucinations[0].referenced, "automagic_parser");
        assert_eq!(
            hallucinations[0].issue,
            "Module 'automagic_parser' does not exist or is not installed"
        );
        let risk = risk.as_ref().unwrap();
        assert_eq!(risk.severity, RiskSeverity::Medium);
        assert_eq!(risk.hallucination_count, 1);
    }

    #[test]
    fn three_unknown_modules_are_high_risk() {
        let code = "import alpha_x\nimport beta_y\nfrom gamma_z import thing\n";
        let report = ReferenceChecker::default().check(code);

        assert_eq!(report.hallucinations().len(), 3);
        let ReferenceReport::Detected { risk: Some(risk), .. } = report else {
            panic!("expected detection");
        };
        assert_eq!(risk.severity, RiskSeverity::High);
    }

    #[test]
    fn configured_modules_are_accepted() {
        let checker = ReferenceChecker::from_config(&AnalysisConfig {
            extra_known_modules: vec!["yaml".into()],
        });
        let report = checker.check("import yaml.loader\n");
        assert_eq!(sources(&report), [("yaml.loader", CONFIGURED_SOURCE)]);
    }

    #[test]
    fn imports_inside_functions_are_found() {
        let code = "def load():\n    import jsn\n    return jsn\n";
        let report = ReferenceChecker::default().check(code);
        let hallucination = &report.hallucinations()[0];
        assert_eq!(hallucination.line, 2);
        assert_eq!(
            hallucination.suggestion.as_deref(),
            Some("Did you mean 'json' from standard library?")
        );
    }

    #[test]
    fn empty_and_broken_code_fail() {
        let checker = ReferenceChecker::default();
        assert_eq!(
            checker.check("   "),
            ReferenceReport::Failed {
                message: "Empty code provided".into()
            }
        );
        let ReferenceReport::Failed { message } = checker.check("import os\ndef broken(:\n") else {
            panic!("expected failure");
        };
        assert!(message.starts_with("Cannot verify code with syntax errors"));
    }
}

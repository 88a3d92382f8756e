//! Request and response shapes exchanged with the four collaborators.
//!
//! Every verdict type is an internally tagged enum keyed on `status`, so the
//! JSON form matches what the HTTP front end returns and what remote
//! implementations of the ports are expected to send.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ReviewScore;

/// Constraints sent with every generation request unless configured otherwise.
pub const DEFAULT_CONSTRAINTS: &[&str] = &["python_only", "no_placeholders"];

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Input to the generation service.
///
/// `previous_attempt` and `feedback` are only present on retries, i.e. once
/// the run's error log holds at least one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attempt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GenerationRequest {
    /// Returns `true` when this request carries feedback from an earlier failure.
    pub fn is_retry(&self) -> bool {
        self.feedback.is_some()
    }
}

/// Verdict of the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResponse {
    Success {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        #[serde(default)]
        dependencies: Vec<String>,
    },
    Error {
        error: String,
        /// The unparsed model output, when there was one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Syntax validation
// ---------------------------------------------------------------------------

/// One syntax problem reported by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxIssue {
    /// 1-based line number; `0` when the issue is not tied to a line.
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    pub issue: String,
    /// The offending source line, trimmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxSummary {
    pub total_lines: usize,
    pub syntax_errors: usize,
    pub ready_for_execution: bool,
}

/// Verdict of the syntax validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyntaxReport {
    Valid {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<SyntaxSummary>,
    },
    Error {
        errors: Vec<SyntaxIssue>,
        /// A deterministic repair that parses cleanly, when one was found.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        corrected_code: Option<String>,
    },
    ParseFailed {
        errors: Vec<SyntaxIssue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl SyntaxReport {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Issues carried by the report (empty when valid).
    pub fn issues(&self) -> &[SyntaxIssue] {
        match self {
            Self::Valid { .. } => &[],
            Self::Error { errors, .. } | Self::ParseFailed { errors, .. } => errors,
        }
    }

    /// The auto-corrected variant, ignoring blank corrections.
    pub fn corrected_code(&self) -> Option<&str> {
        match self {
            Self::Error {
                corrected_code: Some(code),
                ..
            } if !code.trim().is_empty() => Some(code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reference verification
// ---------------------------------------------------------------------------

/// A reference that could not be verified to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hallucination {
    pub line: u32,
    /// What kind of thing was referenced (e.g. `"Library"`).
    #[serde(alias = "type")]
    pub kind: String,
    pub referenced: String,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A reference that resolved, and where it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedComponent {
    pub component: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub severity: RiskSeverity,
    pub impact: String,
    pub hallucination_count: usize,
}

/// Verdict of the reference verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferenceReport {
    Verified {
        #[serde(default)]
        verified_components: Vec<VerifiedComponent>,
    },
    Detected {
        hallucinations: Vec<Hallucination>,
        #[serde(default)]
        verified_components: Vec<VerifiedComponent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        risk: Option<RiskAssessment>,
    },
    Failed {
        message: String,
    },
}

impl ReferenceReport {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    pub fn hallucinations(&self) -> &[Hallucination] {
        match self {
            Self::Detected { hallucinations, .. } => hallucinations,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// A structured issue raised by the reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub title: String,
    pub location: String,
    pub problem: String,
    pub recommendation: String,
}

/// Everything a successful review produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFindings {
    #[serde(default)]
    pub score: Option<ReviewScore>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub critical_issues: Vec<ReviewIssue>,
    #[serde(default)]
    pub major_concerns: Vec<ReviewIssue>,
    #[serde(default)]
    pub minor_suggestions: Vec<String>,
    #[serde(default)]
    pub positive_highlights: Vec<String>,
    #[serde(default)]
    pub checklist: BTreeMap<String, String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_review: Option<String>,
}

/// Verdict of the review service. Never decides the outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewReport {
    Success(ReviewFindings),
    Error { error: String },
}

impl ReviewReport {
    pub fn score(&self) -> Option<ReviewScore> {
        match self {
            Self::Success(findings) => findings.score,
            Self::Error { .. } => None,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Self::Success(findings) => &findings.summary,
            Self::Error { error } => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_response_is_tagged_by_status() {
        let ok: GenerationResponse =
            serde_json::from_str(r#"{"status":"success","code":"x = 1"}"#).unwrap();
        assert_eq!(
            ok,
            GenerationResponse::Success {
                code: "x = 1".into(),
                explanation: None,
                dependencies: vec![],
            }
        );

        let err: GenerationResponse =
            serde_json::from_str(r#"{"status":"error","error":"boom"}"#).unwrap();
        assert!(matches!(err, GenerationResponse::Error { ref error, .. } if error == "boom"));
    }

    #[test]
    fn retry_request_omits_absent_fields() {
        let req = GenerationRequest {
            request: "add two numbers".into(),
            constraints: vec!["python_only".into()],
            previous_attempt: None,
            feedback: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("feedback").is_none());
        assert!(json.get("previous_attempt").is_none());
        assert!(!req.is_retry());
    }

    #[test]
    fn syntax_report_ignores_blank_correction() {
        let report = SyntaxReport::Error {
            errors: vec![],
            corrected_code: Some("   ".into()),
        };
        assert_eq!(report.corrected_code(), None);
        assert!(!report.is_valid());
    }

    #[test]
    fn hallucination_accepts_legacy_type_key() {
        let h: Hallucination = serde_json::from_str(
            r#"{"line":2,"type":"Library","referenced":"foo","issue":"missing"}"#,
        )
        .unwrap();
        assert_eq!(h.kind, "Library");
        assert_eq!(h.suggestion, None);
    }

    #[test]
    fn review_report_flattens_findings() {
        let report = ReviewReport::Success(ReviewFindings {
            score: ReviewScore::new(8.0),
            summary: "solid".into(),
            ..ReviewFindings::default()
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["score"], 8.0);
        assert_eq!(json["summary"], "solid");

        let back: ReviewReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.score().map(ReviewScore::as_f64), Some(8.0));
    }
}

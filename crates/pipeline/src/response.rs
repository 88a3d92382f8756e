//! The structured payload a run ends with.
//!
//! [`compile_success`] and [`compile_failure`] are pure: they read a terminal
//! [`RequestState`] and never decide anything themselves.

use serde::{Deserialize, Serialize};

use crate::{
    PipelineError, RequestId, RequestState, ReviewReport, ReviewScore, RunStatus, Stage,
    Timestamp,
};

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Final result of a pipeline run: what `submit` hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalResponse {
    Success(SuccessResponse),
    Failed(FailureResponse),
}

impl FinalResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Success(s) => s.request_id,
            Self::Failed(f) => f.request_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Per-stage attempt counts, present on both variants.
    pub fn attempts(&self) -> AttemptSummary {
        match self {
            Self::Success(s) => s.metadata.attempts,
            Self::Failed(f) => f.metadata.attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub request_id: RequestId,
    pub code: String,
    pub validation: ValidationSummary,
    pub metadata: SuccessMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_details: Option<ReviewReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub request_id: RequestId,
    pub error: String,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<String>,
    pub metadata: FailureMetadata,
}

/// One row of the validation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub status: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub status: String,
    pub score: Option<ReviewScore>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub syntax: CheckSummary,
    #[serde(rename = "hallucination")]
    pub references: CheckSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewSummary>,
}

/// Attempt counters as they appear in response metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub total_attempts: u32,
    pub generation_attempts: u32,
    pub syntax_fix_attempts: u32,
    pub hallucination_fix_attempts: u32,
}

impl AttemptSummary {
    fn of(state: &RequestState) -> Self {
        let attempts = state.attempts();
        Self {
            total_attempts: attempts.total(),
            generation_attempts: attempts.generation,
            syntax_fix_attempts: attempts.syntax_fix,
            hallucination_fix_attempts: attempts.hallucination_fix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetadata {
    #[serde(flatten)]
    pub attempts: AttemptSummary,
    pub created_at: Timestamp,
    pub completed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureMetadata {
    pub failed_at_stage: Stage,
    #[serde(flatten)]
    pub attempts: AttemptSummary,
    pub created_at: Timestamp,
    pub failed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Builds the success payload for a completed run.
pub fn compile_success(state: &RequestState) -> FinalResponse {
    debug_assert_eq!(state.status(), RunStatus::Completed);

    let review = state.artifacts().review_result.as_ref();
    let review_summary = review.map(|report| ReviewSummary {
        status: match report {
            ReviewReport::Success(_) => "✅ Completed".into(),
            ReviewReport::Error { .. } => "⚠️ Unavailable".into(),
        },
        score: report.score(),
        summary: report.summary().to_string(),
    });

    FinalResponse::Success(SuccessResponse {
        request_id: state.request_id(),
        code: state.generated_code().unwrap_or_default().to_string(),
        validation: ValidationSummary {
            syntax: CheckSummary {
                status: "✅ Valid".into(),
                details: "Python syntax validated successfully".into(),
            },
            references: CheckSummary {
                status: "✅ Verified".into(),
                details: "All imports and functions verified".into(),
            },
            review: review_summary,
        },
        metadata: SuccessMetadata {
            attempts: AttemptSummary::of(state),
            created_at: state.created_at(),
            completed_at: state.finished_at().unwrap_or_else(Timestamp::now),
        },
        review_details: review.cloned(),
    })
}

/// Builds the failure payload for a failed run.
pub fn compile_failure(state: &RequestState, error: &PipelineError) -> FinalResponse {
    FinalResponse::Failed(FailureResponse {
        request_id: state.request_id(),
        error: format!("Failed to generate valid code: {error}"),
        errors: state.error_messages().to_vec(),
        last_attempt: state.generated_code().map(str::to_string),
        metadata: FailureMetadata {
            failed_at_stage: state.failed_at_stage().unwrap_or(state.current_stage()),
            attempts: AttemptSummary::of(state),
            created_at: state.created_at(),
            failed_at: state.finished_at().unwrap_or_else(Timestamp::now),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttemptKind, ReviewFindings};

    fn completed_state() -> RequestState {
        let mut state = RequestState::new("add two numbers");
        state.enter_stage(Stage::Generating);
        state.record_attempt(AttemptKind::Generation);
        state.set_generated_code("def add(a, b):\n    return a + b");
        state.record_attempt(AttemptKind::SyntaxFix);
        state.record_attempt(AttemptKind::HallucinationFix);
        state
    }

    #[test]
    fn success_payload_shape() {
        let mut state = completed_state();
        state.complete();

        let json = serde_json::to_value(compile_success(&state)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["request_id"], state.request_id().to_string());
        assert_eq!(json["code"], "def add(a, b):\n    return a + b");
        assert_eq!(json["validation"]["syntax"]["status"], "✅ Valid");
        assert_eq!(json["validation"]["hallucination"]["status"], "✅ Verified");
        assert!(json["validation"].get("review").is_none());
        assert_eq!(json["metadata"]["generation_attempts"], 1);
        assert_eq!(json["metadata"]["syntax_fix_attempts"], 1);
        assert_eq!(json["metadata"]["hallucination_fix_attempts"], 1);
        assert_eq!(json["metadata"]["total_attempts"], 3);
        assert!(json.get("review_details").is_none());
    }

    #[test]
    fn success_payload_includes_review() {
        let mut state = completed_state();
        state.set_review_result(ReviewReport::Success(ReviewFindings {
            score: ReviewScore::new(8.5),
            summary: "Clear and correct.".into(),
            ..ReviewFindings::default()
        }));
        state.complete();

        let FinalResponse::Success(success) = compile_success(&state) else {
            panic!("expected success");
        };
        let review = success.validation.review.unwrap();
        assert_eq!(review.score.map(ReviewScore::as_f64), Some(8.5));
        assert_eq!(review.summary, "Clear and correct.");
        assert!(success.review_details.is_some());
    }

    #[test]
    fn failure_payload_shape() {
        let mut state = RequestState::new("x");
        state.enter_stage(Stage::Generating);
        for _ in 0..3 {
            state.record_attempt(AttemptKind::Generation);
            state.log_error("Generation error: no code");
        }
        state.fail();
        let error = PipelineError::BudgetExhausted {
            stage: Stage::Generating,
            limit: 3,
        };

        let response = compile_failure(&state, &error);
        assert!(!response.is_success());
        assert_eq!(response.attempts().generation_attempts, 3);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["metadata"]["failed_at_stage"], "code_generation");
        assert_eq!(json["errors"].as_array().unwrap().len(), 3);
        assert!(json.get("last_attempt").is_none());
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to generate valid code"));
    }

    #[test]
    fn payload_deserialises_back() {
        let mut state = completed_state();
        state.complete();
        let response = compile_success(&state);
        let json = serde_json::to_string(&response).unwrap();
        let back: FinalResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}

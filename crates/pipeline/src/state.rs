//! The mutable record of one pipeline run.

use serde::{Deserialize, Serialize};

use crate::{
    AttemptCounts, AttemptKind, ReferenceReport, RequestId, ReviewReport, RunStatus, Stage,
    SyntaxReport, Timestamp,
};

/// The last output produced by each collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub generated_code: Option<String>,
    pub syntax_result: Option<SyntaxReport>,
    pub hallucination_result: Option<ReferenceReport>,
    pub review_result: Option<ReviewReport>,
}

/// State of one pipeline invocation.
///
/// Owned by the executor for the lifetime of the run and passed by `&mut`
/// through the stage runners. Everything outside the executor only ever sees
/// clones of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    request_id: RequestId,
    user_request: String,
    current_stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failed_at_stage: Option<Stage>,
    status: RunStatus,
    attempts: AttemptCounts,
    artifacts: Artifacts,
    error_messages: Vec<String>,
    created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<Timestamp>,
}

impl RequestState {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new_random(),
            user_request: user_request.into(),
            current_stage: Stage::Initialized,
            failed_at_stage: None,
            status: RunStatus::InProgress,
            attempts: AttemptCounts::default(),
            artifacts: Artifacts::default(),
            error_messages: Vec::new(),
            created_at: Timestamp::now(),
            finished_at: None,
        }
    }

    // -- read access --------------------------------------------------------

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn user_request(&self) -> &str {
        &self.user_request
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn failed_at_stage(&self) -> Option<Stage> {
        self.failed_at_stage
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn attempts(&self) -> &AttemptCounts {
        &self.attempts
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn generated_code(&self) -> Option<&str> {
        self.artifacts.generated_code.as_deref()
    }

    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// The newest error log entry: the feedback for the next generation call.
    pub fn latest_feedback(&self) -> Option<&str> {
        self.error_messages.last().map(String::as_str)
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::InProgress
    }

    // -- mutation (executor only) -------------------------------------------

    /// Moves the run to `stage`. Ignored once the run has terminated.
    pub fn enter_stage(&mut self, stage: Stage) {
        if !self.is_terminal() {
            self.current_stage = stage;
        }
    }

    pub fn record_attempt(&mut self, kind: AttemptKind) -> u32 {
        self.attempts.record(kind)
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.error_messages.push(message.into());
    }

    pub fn set_generated_code(&mut self, code: impl Into<String>) {
        self.artifacts.generated_code = Some(code.into());
    }

    pub fn set_syntax_result(&mut self, report: SyntaxReport) {
        self.artifacts.syntax_result = Some(report);
    }

    pub fn set_hallucination_result(&mut self, report: ReferenceReport) {
        self.artifacts.hallucination_result = Some(report);
    }

    pub fn set_review_result(&mut self, report: ReviewReport) {
        self.artifacts.review_result = Some(report);
    }

    /// Terminal transition to success. Has no effect on a terminated run.
    pub fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = RunStatus::Completed;
        self.current_stage = Stage::Completed;
        self.finished_at = Some(Timestamp::now());
    }

    /// Terminal transition to failure, remembering the stage that was running.
    /// Has no effect on a terminated run.
    pub fn fail(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.failed_at_stage = Some(self.current_stage);
        self.status = RunStatus::Failed;
        self.current_stage = Stage::Failed;
        self.finished_at = Some(Timestamp::now());
    }
}

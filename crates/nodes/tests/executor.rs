//! End-to-end runs of the executor against scripted collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodes::{PipelineExecutor, RunOptions};
use pipeline::{
    CodeGenerator, CodeReviewer, FailureResponse, FinalResponse, GenerationRequest,
    GenerationResponse, Hallucination, PipelineConfig, ReferenceReport, ReferenceVerifier,
    ReviewFindings, ReviewReport, ReviewScore, RunStatus, ServiceError, Stage, SuccessResponse,
    SyntaxIssue, SyntaxReport, SyntaxValidator,
};

const GOOD_CODE: &str = "def add(a: int, b: int) -> int:\n    return a + b";

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// Replays scripted answers in order, then falls back to a default.
struct Script<T> {
    queue: Mutex<VecDeque<Result<T, ServiceError>>>,
    fallback: Result<T, ServiceError>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Result<T, ServiceError>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    fn then(self, answer: Result<T, ServiceError>) -> Self {
        self.queue.lock().unwrap().push_back(answer);
        self
    }

    fn next(&self) -> Result<T, ServiceError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

struct FakeGenerator {
    script: Script<GenerationResponse>,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    fn succeeding() -> Self {
        Self::with(Script::new(Ok(success(GOOD_CODE))))
    }

    fn failing() -> Self {
        Self::with(Script::new(Ok(GenerationResponse::Error {
            error: "model refused".into(),
            raw_response: None,
        })))
    }

    fn with(script: Script<GenerationResponse>) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        self.seen.lock().unwrap().push(request.clone());
        self.script.next()
    }
}

struct FakeSyntax {
    script: Script<SyntaxReport>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeSyntax {
    fn valid() -> Self {
        Self::with(Script::new(Ok(SyntaxReport::Valid { summary: None })))
    }

    fn with(script: Script<SyntaxReport>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SyntaxValidator for FakeSyntax {
    async fn validate(
        &self,
        code: &str,
        context: Option<&str>,
    ) -> Result<SyntaxReport, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((code.to_string(), context.map(str::to_string)));
        self.script.next()
    }
}

struct FakeReferences {
    script: Script<ReferenceReport>,
}

impl FakeReferences {
    fn verified() -> Self {
        Self::with(Script::new(Ok(verified())))
    }

    fn with(script: Script<ReferenceReport>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl ReferenceVerifier for FakeReferences {
    async fn verify(&self, _code: &str) -> Result<ReferenceReport, ServiceError> {
        self.script.next()
    }
}

struct FakeReviewer {
    answer: Result<ReviewReport, ServiceError>,
    calls: Mutex<u32>,
}

impl FakeReviewer {
    fn scoring(score: f64) -> Self {
        Self {
            answer: Ok(ReviewReport::Success(ReviewFindings {
                score: ReviewScore::new(score),
                summary: "Solid.".into(),
                ..ReviewFindings::default()
            })),
            calls: Mutex::new(0),
        }
    }

    fn faulting(err: ServiceError) -> Self {
        Self {
            answer: Err(err),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl CodeReviewer for FakeReviewer {
    async fn review(&self, _code: &str, _requirements: &str) -> Result<ReviewReport, ServiceError> {
        *self.calls.lock().unwrap() += 1;
        self.answer.clone()
    }
}

/// Sleeps past any sane timeout on its first call, then succeeds.
struct SlowFirstGenerator {
    slept: AtomicBool,
}

#[async_trait]
impl CodeGenerator for SlowFirstGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        if !self.slept.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(success(GOOD_CODE))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn success(code: &str) -> GenerationResponse {
    GenerationResponse::Success {
        code: code.into(),
        explanation: None,
        dependencies: vec![],
    }
}

fn verified() -> ReferenceReport {
    ReferenceReport::Verified {
        verified_components: vec![],
    }
}

fn syntax_error(corrected: Option<&str>) -> SyntaxReport {
    SyntaxReport::Error {
        errors: vec![SyntaxIssue {
            line: 1,
            offset: None,
            issue: "Missing colon".into(),
            code: Some("def add(a, b)".into()),
            fix: Some("Add ':' at the end of the line".into()),
        }],
        corrected_code: corrected.map(str::to_string),
    }
}

fn hallucinated(module: &str) -> ReferenceReport {
    ReferenceReport::Detected {
        hallucinations: vec![Hallucination {
            line: 1,
            kind: "Library".into(),
            referenced: module.into(),
            issue: format!("Module '{module}' does not exist"),
            suggestion: None,
        }],
        verified_components: vec![],
        risk: None,
    }
}

struct Harness {
    generator: Arc<FakeGenerator>,
    syntax: Arc<FakeSyntax>,
    reviewer: Arc<FakeReviewer>,
    executor: PipelineExecutor,
}

fn harness(
    generator: FakeGenerator,
    syntax: FakeSyntax,
    references: FakeReferences,
    reviewer: FakeReviewer,
    config: PipelineConfig,
) -> Harness {
    let generator = Arc::new(generator);
    let syntax = Arc::new(syntax);
    let reviewer = Arc::new(reviewer);
    let executor = PipelineExecutor::builder(
        generator.clone(),
        syntax.clone(),
        Arc::new(references),
    )
    .reviewer(reviewer.clone())
    .config(config)
    .build()
    .unwrap();
    Harness {
        generator,
        syntax,
        reviewer,
        executor,
    }
}

fn expect_success(response: FinalResponse) -> SuccessResponse {
    match response {
        FinalResponse::Success(s) => s,
        FinalResponse::Failed(f) => panic!("expected success, run failed: {:?}", f.errors),
    }
}

fn expect_failure(response: FinalResponse) -> FailureResponse {
    match response {
        FinalResponse::Failed(f) => f,
        FinalResponse::Success(_) => panic!("expected failure, run succeeded"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_run_counts_one_attempt_per_stage() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);

    assert_eq!(s.code, GOOD_CODE);
    assert_eq!(s.metadata.attempts.generation_attempts, 1);
    assert_eq!(s.metadata.attempts.syntax_fix_attempts, 1);
    assert_eq!(s.metadata.attempts.hallucination_fix_attempts, 1);
    assert_eq!(s.metadata.attempts.total_attempts, 3);
    let review = s.validation.review.expect("review summary");
    assert_eq!(review.status, "✅ Completed");
    assert_eq!(review.score.map(f64::from), Some(9.0));

    let calls = h.syntax.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        [(
            GOOD_CODE.to_string(),
            Some("Generated for: add two numbers".to_string())
        )]
    );
    let first = &h.generator.requests()[0];
    assert_eq!(first.constraints, ["python_only", "no_placeholders"]);
    assert!(first.feedback.is_none() && first.previous_attempt.is_none());
}

#[tokio::test]
async fn three_generation_errors_fail_at_generation() {
    let h = harness(
        FakeGenerator::failing(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let f = expect_failure(h.executor.submit("add two numbers").await);

    assert_eq!(f.metadata.failed_at_stage, Stage::Generating);
    assert_eq!(f.metadata.attempts.generation_attempts, 3);
    assert_eq!(f.metadata.attempts.syntax_fix_attempts, 0);
    assert_eq!(f.errors, vec!["Generation error: model refused"; 3]);
    assert_eq!(f.last_attempt, None);
    assert_eq!(
        f.error,
        "Failed to generate valid code: code_generation stage exhausted its budget of 3 attempt(s)"
    );
    assert!(h.syntax.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn auto_correction_skips_regeneration() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::with(
            Script::new(Ok(SyntaxReport::Valid { summary: None }))
                .then(Ok(syntax_error(Some("def add(a, b):\n    return a + b")))),
        ),
        FakeReferences::verified(),
        FakeReviewer::scoring(8.0),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);

    assert_eq!(s.code, "def add(a, b):\n    return a + b");
    assert_eq!(s.metadata.attempts.generation_attempts, 1);
    assert_eq!(s.metadata.attempts.syntax_fix_attempts, 2);
    let calls = h.syntax.calls.lock().unwrap().clone();
    assert_eq!(calls[1].0, "def add(a, b):\n    return a + b");
}

#[tokio::test]
async fn hallucination_triggers_regeneration_with_feedback() {
    let h = harness(
        FakeGenerator::with(
            Script::new(Ok(success(GOOD_CODE))).then(Ok(success("import fakelib\n"))),
        ),
        FakeSyntax::valid(),
        FakeReferences::with(Script::new(Ok(verified())).then(Ok(hallucinated("fakelib")))),
        FakeReviewer::scoring(7.0),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);

    assert_eq!(s.code, GOOD_CODE);
    assert_eq!(s.metadata.attempts.hallucination_fix_attempts, 2);
    assert_eq!(s.metadata.attempts.generation_attempts, 2);

    let requests = h.generator.requests();
    let retry = &requests[1];
    assert_eq!(retry.previous_attempt.as_deref(), Some("import fakelib\n"));
    let feedback = retry.feedback.as_deref().unwrap();
    assert!(feedback.starts_with("Hallucinations Detected:\n1. Library: fakelib\n"));
    assert!(feedback.contains("Suggestion: Remove or replace"));
}

#[tokio::test]
async fn retry_feedback_is_latest_log_entry() {
    let h = harness(
        FakeGenerator::with(
            Script::new(Ok(success(GOOD_CODE)))
                .then(Ok(GenerationResponse::Error {
                    error: "boom".into(),
                    raw_response: None,
                }))
                .then(Err(ServiceError::Transport {
                    message: "connection reset".into(),
                })),
        ),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(7.0),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);
    assert_eq!(s.metadata.attempts.generation_attempts, 3);

    let requests = h.generator.requests();
    assert_eq!(requests[0].feedback, None);
    assert_eq!(requests[1].feedback.as_deref(), Some("Generation error: boom"));
    assert_eq!(
        requests[2].feedback.as_deref(),
        Some("Generation exception: transport failure: connection reset")
    );
    assert!(requests.iter().all(|r| r.previous_attempt.is_none()));
}

#[tokio::test]
async fn review_fault_is_downgraded() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::faulting(ServiceError::Unavailable {
            message: "no credentials".into(),
        }),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);

    let review = s.validation.review.expect("review summary");
    assert_eq!(review.status, "⚠️ Unavailable");
    assert_eq!(review.score, None);
    assert!(matches!(s.review_details, Some(ReviewReport::Error { .. })));
}

#[tokio::test]
async fn review_can_be_disabled_per_run() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let s = expect_success(
        h.executor
            .submit_with("add two numbers", RunOptions { enable_review: false })
            .await,
    );

    assert!(s.validation.review.is_none());
    assert!(s.review_details.is_none());
    assert_eq!(*h.reviewer.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn syntax_budget_exhaustion_names_syntax_stage() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::with(Script::new(Ok(syntax_error(None)))),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let f = expect_failure(h.executor.submit("add two numbers").await);

    assert_eq!(f.metadata.failed_at_stage, Stage::SyntaxCheck);
    assert_eq!(f.metadata.attempts.syntax_fix_attempts, 3);
    assert_eq!(f.metadata.attempts.generation_attempts, 4);
    assert_eq!(f.errors.len(), 3);
    assert!(f.errors.iter().all(|e| e.starts_with("Syntax Errors Found:\n1. Line 1: Missing colon")));
    assert_eq!(f.last_attempt.as_deref(), Some(GOOD_CODE));
}

#[tokio::test]
async fn reference_budget_exhaustion_names_reference_stage() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::with(Script::new(Ok(hallucinated("magicpkg")))),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let f = expect_failure(h.executor.submit("add two numbers").await);

    assert_eq!(f.metadata.failed_at_stage, Stage::ReferenceCheck);
    assert_eq!(f.metadata.attempts.hallucination_fix_attempts, 3);
    assert_eq!(f.metadata.attempts.generation_attempts, 4);
}

#[tokio::test]
async fn nested_generation_failure_names_generation_stage() {
    let h = harness(
        FakeGenerator::with(
            Script::new(Ok(GenerationResponse::Error {
                error: "model refused".into(),
                raw_response: None,
            }))
            .then(Ok(success("def add(a, b)\n    return a + b"))),
        ),
        FakeSyntax::with(Script::new(Ok(syntax_error(None)))),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let f = expect_failure(h.executor.submit("add two numbers").await);

    assert_eq!(f.metadata.failed_at_stage, Stage::Generating);
    assert_eq!(f.metadata.attempts.syntax_fix_attempts, 1);
    assert_eq!(f.metadata.attempts.generation_attempts, 4);
    assert_eq!(f.last_attempt.as_deref(), Some("def add(a, b)\n    return a + b"));
}

#[tokio::test]
async fn syntax_fault_consumes_a_pass() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::with(
            Script::new(Ok(SyntaxReport::Valid { summary: None })).then(Err(
                ServiceError::MalformedResponse {
                    message: "not json".into(),
                },
            )),
        ),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let s = expect_success(h.executor.submit("add two numbers").await);
    assert_eq!(s.metadata.attempts.syntax_fix_attempts, 2);
    assert_eq!(s.metadata.attempts.generation_attempts, 1);
}

#[tokio::test]
async fn global_cap_stops_generation() {
    let config = PipelineConfig {
        max_total_generation_attempts: Some(2),
        ..PipelineConfig::default()
    };
    let h = harness(
        FakeGenerator::failing(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        config,
    );

    let f = expect_failure(h.executor.submit("add two numbers").await);

    assert_eq!(f.metadata.attempts.generation_attempts, 2);
    assert_eq!(f.metadata.failed_at_stage, Stage::Generating);
    assert!(f.error.contains("global generation cap reached"));
}

#[tokio::test(start_paused = true)]
async fn slow_generator_times_out() {
    let config = PipelineConfig {
        collaborator_timeout_secs: 1,
        ..PipelineConfig::default()
    };
    let executor = PipelineExecutor::builder(
        Arc::new(SlowFirstGenerator {
            slept: AtomicBool::new(false),
        }),
        Arc::new(FakeSyntax::valid()),
        Arc::new(FakeReferences::verified()),
    )
    .config(config)
    .build()
    .unwrap();

    let response = executor.submit("add two numbers").await;
    let state = executor.lookup(response.request_id()).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.attempts().generation_attempts, 2);
    assert_eq!(state.error_messages(), ["Generation exception: call timed out after 1s"]);
}

#[tokio::test]
async fn lookup_is_stable_after_submit() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let response = h.executor.submit("add two numbers").await;
    let id = response.request_id();

    let first = h.executor.lookup(id).await.unwrap();
    let second = h.executor.lookup(id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.status(), RunStatus::Completed);
    assert_eq!(first.current_stage(), Stage::Completed);
    assert!(first.artifacts().review_result.is_some());
    assert!(h.executor.lookup(pipeline::RequestId::new_random()).await.is_none());
}

#[tokio::test]
async fn render_produces_markdown() {
    let h = harness(
        FakeGenerator::succeeding(),
        FakeSyntax::valid(),
        FakeReferences::verified(),
        FakeReviewer::scoring(9.0),
        PipelineConfig::default(),
    );

    let response = h.executor.submit("add two numbers").await;
    let doc = h.executor.render(&response);
    assert!(doc.starts_with("# Generated Code"));
    assert!(doc.contains(GOOD_CODE));
}

#[test]
fn invalid_config_is_rejected() {
    let result = PipelineExecutor::builder(
        Arc::new(FakeGenerator::succeeding()),
        Arc::new(FakeSyntax::valid()),
        Arc::new(FakeReferences::verified()),
    )
    .config(PipelineConfig {
        max_generation_retries: 0,
        ..PipelineConfig::default()
    })
    .build();
    assert!(result.is_err());
}

#[test]
fn failure_payload_serializes_with_wire_names() {
    let failure = FinalResponse::Failed(FailureResponse {
        request_id: pipeline::RequestId::new_random(),
        error: "x".into(),
        errors: vec![],
        last_attempt: None,
        metadata: pipeline::FailureMetadata {
            failed_at_stage: Stage::ReferenceCheck,
            attempts: pipeline::AttemptSummary {
                total_attempts: 0,
                generation_attempts: 0,
                syntax_fix_attempts: 0,
                hallucination_fix_attempts: 0,
            },
            created_at: pipeline::Timestamp::now(),
            failed_at: pipeline::Timestamp::now(),
        },
    });
    let json = serde_json::to_value(&failure).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["metadata"]["failed_at_stage"], "hallucination_check");
}

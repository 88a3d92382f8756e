//! Core orchestration domain for Codesmith.
//!
//! This crate contains every domain concept the pipeline controller works
//! with: the per-run [`RequestState`], the request/response contracts of the
//! four collaborators, the port traits those collaborators implement, the
//! feedback formatter, and the response compiler. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RequestId`, `ModelName`) |
//! | [`types`] | Shared value types (`Stage`, `AttemptCounts`, `Timestamp`, ...) |
//! | [`errors`] | Pipeline, collaborator, and retry-policy types |
//! | [`config`] | Stage budgets and limits |
//! | [`contracts`] | Collaborator request/verdict shapes |
//! | [`ports`] | Collaborator and LLM provider traits |
//! | [`state`] | The per-run [`RequestState`] record |
//! | [`feedback`] | Correction briefs fed back into generation |
//! | [`response`] | Final success/failure payloads |
//! | [`render`] | Markdown rendering of a payload |

pub mod config;
pub mod contracts;
pub mod errors;
pub mod feedback;
pub mod identifiers;
pub mod ports;
pub mod render;
pub mod response;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::PipelineConfig;
pub use contracts::{
    GenerationRequest, GenerationResponse, Hallucination, ReferenceReport, ReviewFindings,
    ReviewIssue, ReviewReport, RiskAssessment, RiskSeverity, SyntaxIssue, SyntaxReport,
    SyntaxSummary, VerifiedComponent, DEFAULT_CONSTRAINTS,
};
pub use errors::{PipelineError, RetryPolicy, ServiceError};
pub use feedback::{format_reference_errors, format_syntax_errors};
pub use identifiers::{ModelName, RequestId};
pub use ports::{
    CodeGenerator, CodeReviewer, CompletionRequest, CompletionResponse, LlmProvider,
    ReferenceVerifier, SyntaxValidator,
};
pub use render::render_markdown;
pub use response::{
    compile_failure, compile_success, AttemptSummary, CheckSummary, FailureMetadata,
    FailureResponse, FinalResponse, ReviewSummary, SuccessMetadata, SuccessResponse,
    ValidationSummary,
};
pub use state::{Artifacts, RequestState};
pub use types::{AttemptCounts, AttemptKind, ReviewScore, RunStatus, Stage, Timestamp, TokenCount};

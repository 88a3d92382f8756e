//! Markdown rendering of a [`FinalResponse`] for terminals and logs.
//!
//! Purely presentational: it reads the payload and never looks at run state.

use std::fmt::Write as _;

use crate::{FailureResponse, FinalResponse, SuccessResponse};

pub fn render_markdown(response: &FinalResponse) -> String {
    match response {
        FinalResponse::Success(success) => render_success(success),
        FinalResponse::Failed(failure) => render_failure(failure),
    }
}

fn render_success(response: &SuccessResponse) -> String {
    let mut md = String::from("# Generated Code\n\n");
    let _ = write!(md, "```python\n{}\n```\n\n", response.code);

    md.push_str("## Validation Status\n\n");
    md.push_str("| Check | Status | Details |\n");
    md.push_str("|-------|--------|---------|\n");
    let v = &response.validation;
    let _ = writeln!(md, "| Syntax | {} | {} |", v.syntax.status, v.syntax.details);
    let _ = writeln!(
        md,
        "| Hallucination | {} | {} |",
        v.references.status, v.references.details
    );
    if let Some(review) = &v.review {
        let score = review
            .score
            .map(|s| format!("Score: {s}/10"))
            .unwrap_or_else(|| "Score: N/A".into());
        let _ = writeln!(md, "| Code Review | {} | {} |", review.status, score);
    }

    let m = &response.metadata;
    md.push_str("\n## Metadata\n\n");
    let _ = writeln!(md, "- Total Attempts: {}", m.attempts.total_attempts);
    let _ = writeln!(md, "- Generation Attempts: {}", m.attempts.generation_attempts);
    let _ = writeln!(md, "- Syntax Fix Attempts: {}", m.attempts.syntax_fix_attempts);
    let _ = writeln!(
        md,
        "- Hallucination Fix Attempts: {}",
        m.attempts.hallucination_fix_attempts
    );
    let _ = writeln!(md, "- Created At: {}", m.created_at);
    let _ = writeln!(md, "- Completed At: {}", m.completed_at);
    let _ = writeln!(md, "- Request ID: {}", response.request_id);
    md
}

fn render_failure(response: &FailureResponse) -> String {
    let mut md = String::from("# Code Generation Failed\n\n");
    let _ = write!(md, "**Error**: {}\n\n", response.error);

    md.push_str("## Error Details\n\n");
    for (i, error) in response.errors.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, error.trim_end());
    }

    let m = &response.metadata;
    md.push_str("\n## Metadata\n\n");
    let _ = writeln!(md, "- Failed at Stage: {}", m.failed_at_stage);
    let _ = writeln!(md, "- Total Attempts: {}", m.attempts.total_attempts);
    let _ = writeln!(md, "- Created At: {}", m.created_at);
    let _ = writeln!(md, "- Failed At: {}", m.failed_at);
    let _ = writeln!(md, "- Request ID: {}", response.request_id);

    if let Some(code) = &response.last_attempt {
        let _ = write!(md, "\n## Last Attempt\n\n```python\n{code}\n```\n");
    }
    md
}

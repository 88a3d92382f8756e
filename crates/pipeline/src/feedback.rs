//! Correction briefs fed back into generation.
//!
//! The brief is the only memory the generator has of why its previous attempt
//! was rejected, so it must be deterministic and self-contained.

use std::fmt::Write as _;

use crate::{ReferenceReport, SyntaxReport};

/// Renders a syntax report as a numbered list of issues and fixes.
pub fn format_syntax_errors(report: &SyntaxReport) -> String {
    let mut brief = String::from("Syntax Errors Found:\n");
    let issues = report.issues();
    if issues.is_empty() {
        brief.push_str("(no details reported)\n");
        return brief;
    }
    for (i, issue) in issues.iter().enumerate() {
        let _ = writeln!(brief, "{}. Line {}: {}", i + 1, issue.line, issue.issue);
        let _ = writeln!(
            brief,
            "   Fix: {}",
            issue.fix.as_deref().unwrap_or("No suggestion")
        );
    }
    brief
}

/// Renders a reference report as a numbered list of unresolved references.
pub fn format_reference_errors(report: &ReferenceReport) -> String {
    if let ReferenceReport::Failed { message } = report {
        return format!("Reference verification failed: {message}\n");
    }
    let mut brief = String::from("Hallucinations Detected:\n");
    let hallucinations = report.hallucinations();
    if hallucinations.is_empty() {
        brief.push_str("(no details reported)\n");
        return brief;
    }
    for (i, h) in hallucinations.iter().enumerate() {
        let _ = writeln!(brief, "{}. {}: {}", i + 1, h.kind, h.referenced);
        let _ = writeln!(brief, "   Issue: {}", h.issue);
        let _ = writeln!(
            brief,
            "   Suggestion: {}",
            h.suggestion.as_deref().unwrap_or("Remove or replace")
        );
    }
    brief
}

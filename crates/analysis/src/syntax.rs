//! Local syntax validation backed by tree-sitter-python.

use async_trait::async_trait;
use pipeline::{ServiceError, SyntaxIssue, SyntaxReport, SyntaxSummary, SyntaxValidator};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tree_sitter::Node;

use crate::{python, AnalysisError};

/// Keywords that open a block and therefore need a trailing `:`.
const BLOCK_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else", "for", "while", "try", "except", "finally", "with",
];

// ---------------------------------------------------------------------------
// Diagnosis
// ---------------------------------------------------------------------------

/// What a single appended character would repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repair {
    Colon,
    Paren,
    Bracket,
}

impl Repair {
    fn suffix(self) -> char {
        match self {
            Self::Colon => ':',
            Self::Paren => ')',
            Self::Bracket => ']',
        }
    }
}

struct Diagnosis {
    fix: String,
    repair: Option<Repair>,
}

fn opens_block(text: &str) -> bool {
    let first_word = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();
    BLOCK_KEYWORDS.contains(&first_word) && !text.ends_with(':')
}

fn unbalanced(text: &str, open: char, close: char) -> bool {
    text.matches(open).count() > text.matches(close).count()
}

/// Pattern-match one trimmed source line against the common mistakes.
fn diagnose_line(text: &str) -> Option<Diagnosis> {
    let diagnosis = |fix: String, repair| Some(Diagnosis { fix, repair });

    if opens_block(text) {
        return diagnosis(format!("Add ':' at the end → {text}:"), Some(Repair::Colon));
    }
    if unbalanced(text, '(', ')') {
        return diagnosis("Add closing parenthesis ')'".into(), Some(Repair::Paren));
    }
    if unbalanced(text, '[', ']') {
        return diagnosis("Add closing bracket ']'".into(), Some(Repair::Bracket));
    }
    if unbalanced(text, '{', '}') {
        return diagnosis("Add closing brace '}'".into(), None);
    }
    if text.matches('"').count() % 2 != 0 {
        return diagnosis("Add closing double quote \"".into(), None);
    }
    if text.matches('\'').count() % 2 != 0 {
        return diagnosis("Add closing single quote '".into(), None);
    }
    None
}

/// tree-sitter often reports an error one line after the real mistake
/// (a missing `:` shows up at the indented body), so nearby lines are
/// inspected too.
fn candidate_rows(row: usize) -> impl Iterator<Item = usize> {
    [Some(row), row.checked_sub(1), Some(row + 1)].into_iter().flatten()
}

fn describe(code: &str, error: Node<'_>) -> (SyntaxIssue, Option<Repair>) {
    let lines: Vec<&str> = code.split('\n').collect();
    let position = error.start_position();
    let missing = error.is_missing().then(|| error.kind().to_string());

    let found = candidate_rows(position.row).find_map(|row| {
        let text = lines.get(row)?.trim();
        diagnose_line(text).map(|d| (row, d))
    });

    let (row, fix, repair) = match found {
        Some((row, Diagnosis { fix, repair })) => (row, fix, repair),
        None => {
            let fix = match &missing {
                Some(kind) => format!("Insert missing '{kind}'"),
                None => "Check syntax around this line".to_string(),
            };
            (position.row, fix, None)
        }
    };

    let issue = SyntaxIssue {
        line: u32::try_from(row + 1).unwrap_or(u32::MAX),
        offset: (row == position.row)
            .then(|| u32::try_from(position.column + 1).unwrap_or(u32::MAX)),
        issue: match missing {
            Some(kind) => format!("Missing '{kind}'"),
            None => "Invalid syntax".to_string(),
        },
        code: Some(lines.get(row).map(|l| l.trim()).unwrap_or_default().to_string()),
        fix: Some(fix),
    };
    (issue, repair)
}

/// Append the repair character to the offending line and keep the result
/// only if the whole file is then accepted.
fn attempt_correction(code: &str, line: u32, repair: Repair) -> Option<String> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    let mut lines: Vec<String> = code.split('\n').map(str::to_string).collect();
    let target = lines.get_mut(index)?;
    let mut repaired = target.trim_end().to_string();
    repaired.push(repair.suffix());
    *target = repaired;

    let corrected = lines.join("\n");
    accepted(&corrected).then_some(corrected)
}

// ---------------------------------------------------------------------------
// Python 3 rules
// ---------------------------------------------------------------------------

/// A shape the tree-sitter grammar accepts but CPython rejects.
struct Violation<'t> {
    node: Node<'t>,
    issue: String,
    fix: String,
}

/// Whether `node` sits in the body of a function or lambda. Class bodies
/// start a new scope, so they do not count.
fn inside_function(node: Node<'_>) -> bool {
    let mut child = node;
    while let Some(parent) = child.parent() {
        match parent.kind() {
            "function_definition" | "lambda" => {
                return parent
                    .child_by_field_name("body")
                    .is_some_and(|body| body.id() == child.id());
            }
            "class_definition" => return false,
            _ => child = parent,
        }
    }
    false
}

/// The first positional parameter without a default that follows one with
/// a default. `*`, `*args` and `**kwargs` end the positional run.
fn misordered_parameter(parameters: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = parameters.walk();
    let mut seen_default = false;
    for param in parameters.named_children(&mut cursor) {
        match param.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                return None;
            }
            "typed_parameter" => {
                let splat = param.named_child(0).is_some_and(|first| {
                    matches!(
                        first.kind(),
                        "list_splat_pattern" | "dictionary_splat_pattern"
                    )
                });
                if splat {
                    return None;
                }
                if seen_default {
                    return Some(param);
                }
            }
            "identifier" | "tuple_pattern" if seen_default => return Some(param),
            _ => {}
        }
    }
    None
}

fn python3_violation<'t>(root: Node<'t>, code: &str) -> Option<Violation<'t>> {
    let mut found = None;
    python::walk(root, |node| {
        let violation = match node.kind() {
            kind @ ("print_statement" | "exec_statement") => {
                let keyword = kind.trim_end_matches("_statement");
                Some(Violation {
                    node,
                    issue: format!("Missing parentheses in call to '{keyword}'"),
                    fix: format!("Call it as a function → {keyword}(...)"),
                })
            }
            "return_statement" if !inside_function(node) => Some(Violation {
                node,
                issue: "'return' outside function".into(),
                fix: "Move the return into a function body".into(),
            }),
            "yield" if node.is_named() && !inside_function(node) => Some(Violation {
                node,
                issue: "'yield' outside function".into(),
                fix: "Move the yield into a function body".into(),
            }),
            "parameters" | "lambda_parameters" => {
                misordered_parameter(node).map(|param| Violation {
                    node: param,
                    issue: "Non-default argument follows default argument".into(),
                    fix: format!(
                        "Give '{}' a default value or move it before the defaulted parameters",
                        python::node_text(&param, code)
                    ),
                })
            }
            _ => None,
        };
        found = violation;
        found.is_none()
    });
    found
}

impl Violation<'_> {
    fn into_issue(self, code: &str) -> SyntaxIssue {
        let position = self.node.start_position();
        SyntaxIssue {
            line: u32::try_from(position.row + 1).unwrap_or(u32::MAX),
            offset: Some(u32::try_from(position.column + 1).unwrap_or(u32::MAX)),
            issue: self.issue,
            code: Some(
                code.split('\n')
                    .nth(position.row)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
            ),
            fix: Some(self.fix),
        }
    }
}

/// Parses cleanly under tree-sitter and breaks none of the Python 3 rules.
fn accepted(code: &str) -> bool {
    python::parse(code).is_ok_and(|tree| {
        let root = tree.root_node();
        !root.has_error() && python3_violation(root, code).is_none()
    })
}

// ---------------------------------------------------------------------------
// SyntaxChecker
// ---------------------------------------------------------------------------

/// Validates Python source without executing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxChecker;

impl SyntaxChecker {
    pub fn new() -> Self {
        Self
    }

    /// Validate one snippet.
    ///
    /// Only the first error is reported; fixing it usually shifts every
    /// error after it.
    pub fn check(&self, code: &str) -> SyntaxReport {
        if code.trim().is_empty() {
            return SyntaxReport::ParseFailed {
                errors: vec![SyntaxIssue {
                    line: 0,
                    offset: None,
                    issue: "Empty or whitespace-only code provided".into(),
                    code: Some(String::new()),
                    fix: Some("Provide valid Python code".into()),
                }],
                message: None,
            };
        }

        let tree = match python::parse(code) {
            Ok(tree) => tree,
            Err(e) => return parse_failed(&e),
        };
        let root = tree.root_node();

        let Some(error) = root.has_error().then(|| python::first_error(root)).flatten() else {
            if let Some(violation) = python3_violation(root, code) {
                let issue = violation.into_issue(code);
                debug!(line = issue.line, issue = %issue.issue, "Python 3 rule violated");
                return SyntaxReport::Error {
                    errors: vec![issue],
                    corrected_code: None,
                };
            }
            return SyntaxReport::Valid {
                summary: Some(SyntaxSummary {
                    total_lines: code.split('\n').count(),
                    syntax_errors: 0,
                    ready_for_execution: true,
                }),
            };
        };

        let (issue, repair) = describe(code, error);
        debug!(line = issue.line, issue = %issue.issue, "Syntax error found");
        let corrected_code = repair.and_then(|r| attempt_correction(code, issue.line, r));

        SyntaxReport::Error {
            errors: vec![issue],
            corrected_code,
        }
    }

    /// Validate several snippets and summarize.
    pub fn check_multiple<S: AsRef<str>>(&self, snippets: &[S]) -> BatchReport {
        let results: Vec<SyntaxReport> = snippets.iter().map(|s| self.check(s.as_ref())).collect();
        let valid_snippets = results.iter().filter(|r| r.is_valid()).count();
        BatchReport {
            overall_status: if valid_snippets == results.len() {
                BatchStatus::AllValid
            } else {
                BatchStatus::ErrorsFound
            },
            total_snippets: results.len(),
            valid_snippets,
            results,
        }
    }
}

fn parse_failed(error: &AnalysisError) -> SyntaxReport {
    SyntaxReport::ParseFailed {
        errors: vec![SyntaxIssue {
            line: 0,
            offset: None,
            issue: error.to_string(),
            code: Some(String::new()),
            fix: Some("Review code structure".into()),
        }],
        message: Some(format!("Failed to parse code: {error}")),
    }
}

#[async_trait]
impl SyntaxValidator for SyntaxChecker {
    async fn validate(
        &self,
        code: &str,
        context: Option<&str>,
    ) -> Result<SyntaxReport, ServiceError> {
        debug!(context = context.unwrap_or_default(), "Validating syntax");
        Ok(self.check(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    AllValid,
    ErrorsFound,
}

/// Result of [`SyntaxChecker::check_multiple`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub overall_status: BatchStatus,
    pub total_snippets: usize,
    pub valid_snippets: usize,
    pub results: Vec<SyntaxReport>,
}

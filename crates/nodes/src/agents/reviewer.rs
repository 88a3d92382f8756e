use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    CodeReviewer, CompletionRequest, LlmProvider, ReviewFindings, ReviewIssue, ReviewReport,
    ReviewScore, ServiceError,
};
use regex::Regex;

use super::AgentSettings;
use crate::AgentError;

const FOCUS_AREAS: &[&str] = &["correctness", "security", "performance", "maintainability"];

const SYSTEM_PROMPT: &str = "\
You are a meticulous Python code reviewer. Review for correctness, security, \
performance, and maintainability, and answer in exactly this markdown layout:

## Overall Assessment
<two or three sentences>
Score: <0-10>/10

## Critical Issues
### Issue 1: <title>
- **Location**: <function or line>
- **Problem**: <what is wrong>
- **Recommendation**: <how to fix it>

## Major Concerns
<same structure as Critical Issues, or `None`>

## Minor Suggestions
- <suggestion>

## Positive Highlights
- <highlight>

## Checklist
| Category | Status |
|----------|--------|
| Correctness | ✅ |

## Action Items
1. [ ] <action>";

/// Compiled once per reviewer; shared by every parse.
struct ReviewPatterns {
    score: Regex,
    issue_title: Regex,
    issue_field: Regex,
    bullet: Regex,
    checklist_row: Regex,
    action_item: Regex,
}

impl ReviewPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            score: Regex::new(r"(?i)Score[:\s]+(\d+(?:\.\d+)?)\s*/\s*10")?,
            issue_title: Regex::new(r"(?i)^###\s*Issue\s*\d*:?\s*(.+)$")?,
            issue_field: Regex::new(
                r"(?i)^\s*-\s*\*\*(Location|Problem|Impact|Recommendation)\*\*:\s*(.+)$",
            )?,
            bullet: Regex::new(r"(?m)^\s*[-•*]\s*(.+)$")?,
            checklist_row: Regex::new(r"\|\s*(\w+)\s*\|\s*([✅⚠\x{FE0F}❌]+)")?,
            action_item: Regex::new(r"\d+\.\s*\[[ xX]\]\s*(.+)")?,
        })
    }
}

/// Reviews accepted code by prompting an LLM and parsing its structured reply.
pub struct LlmCodeReviewer {
    provider: Arc<dyn LlmProvider>,
    settings: AgentSettings,
    patterns: ReviewPatterns,
}

impl LlmCodeReviewer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: AgentSettings) -> Result<Self, AgentError> {
        settings.validate()?;
        Ok(Self {
            provider,
            settings,
            patterns: ReviewPatterns::compile()?,
        })
    }

    fn prompt(code: &str, requirements: &str) -> String {
        let mut prompt = format!("Please review the following Python code:\n\n```python\n{code}\n```\n\n");
        if !requirements.trim().is_empty() {
            prompt.push_str(&format!("**Original Requirements**: {requirements}\n\n"));
        }
        prompt.push_str(&format!("**Focus Areas**: {}\n\n", FOCUS_AREAS.join(", ")));
        prompt.push_str(
            "Provide a comprehensive code review following the structured format in your instructions.",
        );
        prompt
    }

    fn parse(&self, review: &str) -> ReviewFindings {
        let p = &self.patterns;
        let score = p
            .score
            .captures(review)
            .and_then(|c| c[1].parse::<f64>().ok())
            .and_then(ReviewScore::new);

        let bullets = |heading: &str| -> Vec<String> {
            section(review, heading, false)
                .map(|body| {
                    p.bullet
                        .captures_iter(body)
                        .map(|c| c[1].trim().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };

        let checklist: BTreeMap<String, String> = section(review, "Checklist", false)
            .map(|body| {
                p.checklist_row
                    .captures_iter(body)
                    .map(|c| (c[1].to_string(), c[2].to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let action_items: Vec<String> = section(review, "Action Items", false)
            .map(|body| {
                p.action_item
                    .captures_iter(body)
                    .map(|c| c[1].trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        ReviewFindings {
            score,
            summary: section(review, "Overall Assessment", true)
                .map(|body| body.trim().to_string())
                .unwrap_or_default(),
            critical_issues: self.issues(section(review, "Critical Issues", false)),
            major_concerns: self.issues(section(review, "Major Concerns", false)),
            minor_suggestions: bullets("Minor Suggestions"),
            positive_highlights: bullets("Positive Highlights"),
            checklist,
            action_items,
            raw_review: Some(review.to_string()),
        }
    }

    /// Parses `### Issue` blocks; a block without a location and problem is skipped.
    fn issues(&self, body: Option<&str>) -> Vec<ReviewIssue> {
        let Some(body) = body else {
            return Vec::new();
        };
        let mut issues = Vec::new();
        let mut current: Option<IssueDraft> = None;

        for line in body.lines() {
            if let Some(caps) = self.patterns.issue_title.captures(line) {
                issues.extend(current.take().and_then(IssueDraft::finish));
                current = Some(IssueDraft::titled(caps[1].trim()));
            } else if let (Some(draft), Some(caps)) =
                (current.as_mut(), self.patterns.issue_field.captures(line))
            {
                draft.set(&caps[1], caps[2].trim());
            }
        }
        issues.extend(current.and_then(IssueDraft::finish));
        issues
    }
}

#[derive(Default)]
struct IssueDraft {
    title: String,
    location: Option<String>,
    problem: Option<String>,
    recommendation: Option<String>,
}

impl IssueDraft {
    fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    fn set(&mut self, field: &str, value: &str) {
        let slot = match field.to_ascii_lowercase().as_str() {
            "location" => &mut self.location,
            "problem" => &mut self.problem,
            // Impact only fills in when no explicit recommendation was given.
            "impact" if self.recommendation.is_some() => return,
            _ => &mut self.recommendation,
        };
        *slot = Some(value.to_string());
    }

    fn finish(self) -> Option<ReviewIssue> {
        Some(ReviewIssue {
            title: self.title,
            location: self.location?,
            problem: self.problem?,
            recommendation: self.recommendation.unwrap_or_default(),
        })
    }
}

/// Body of the `## <heading>` section, up to the next level-2 heading.
/// With `stop_at_any_heading`, deeper headings end the section too.
fn section<'a>(text: &'a str, heading: &str, stop_at_any_heading: bool) -> Option<&'a str> {
    let marker = format!("## {heading}");
    let start = text
        .match_indices(&marker)
        .find(|(i, _)| *i == 0 || text[..*i].ends_with('\n'))?
        .0;
    let body_start = text[start..].find('\n').map(|n| start + n + 1)?;
    let body = &text[body_start..];

    let mut end = body.len();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let is_boundary = if stop_at_any_heading {
            line.starts_with('#')
        } else {
            line.starts_with("## ") || line.starts_with("# ")
        };
        if is_boundary {
            end = offset;
            break;
        }
        offset += line.len();
    }
    Some(&body[..end])
}

#[async_trait]
impl CodeReviewer for LlmCodeReviewer {
    async fn review(&self, code: &str, requirements: &str) -> Result<ReviewReport, ServiceError> {
        let completion = self
            .provider
            .complete(&CompletionRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                prompt: Self::prompt(code, requirements),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await;

        Ok(match completion {
            Ok(completion) => ReviewReport::Success(self.parse(&completion.text)),
            Err(fault) => ReviewReport::Error {
                error: fault.to_string(),
            },
        })
    }
}

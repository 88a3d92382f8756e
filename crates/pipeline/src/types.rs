//! Shared value types for the Codesmith pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. review scores are in `[0.0, 10.0]`,
//! attempt counters never decrease) and participate in pipeline decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Position of a run within the fixed pipeline.
///
/// Serialised with the wire names clients already depend on
/// (`"code_generation"`, `"hallucination_check"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "initialized")]
    Initialized,
    #[serde(rename = "code_generation")]
    Generating,
    #[serde(rename = "syntax_check")]
    SyntaxCheck,
    #[serde(rename = "hallucination_check")]
    ReferenceCheck,
    #[serde(rename = "code_review")]
    Review,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl Stage {
    /// Returns the wire name of this stage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Generating => "code_generation",
            Self::SyntaxCheck => "syntax_check",
            Self::ReferenceCheck => "hallucination_check",
            Self::Review => "code_review",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Overall outcome of a run. Leaves `InProgress` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Attempt accounting
// ---------------------------------------------------------------------------

/// The three budgets a run draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Generation,
    SyntaxFix,
    HallucinationFix,
}

/// Cumulative attempt counters for one run.
///
/// Counters start at zero when the [`crate::RequestState`] is created and only
/// ever increase. A nested re-entry into generation from a downstream stage
/// keeps counting from where the previous invocation stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub generation: u32,
    pub syntax_fix: u32,
    pub hallucination_fix: u32,
}

impl AttemptCounts {
    /// Records one attempt of `kind` and returns the new cumulative count.
    pub fn record(&mut self, kind: AttemptKind) -> u32 {
        let slot = match kind {
            AttemptKind::Generation => &mut self.generation,
            AttemptKind::SyntaxFix => &mut self.syntax_fix,
            AttemptKind::HallucinationFix => &mut self.hallucination_fix,
        };
        *slot += 1;
        *slot
    }

    /// Returns the cumulative count for `kind`.
    pub fn get(&self, kind: AttemptKind) -> u32 {
        match kind {
            AttemptKind::Generation => self.generation,
            AttemptKind::SyntaxFix => self.syntax_fix,
            AttemptKind::HallucinationFix => self.hallucination_fix,
        }
    }

    /// Sum of all three counters.
    pub fn total(&self) -> u32 {
        self.generation + self.syntax_fix + self.hallucination_fix
    }
}

// ---------------------------------------------------------------------------
// Token accounting
// ---------------------------------------------------------------------------

/// Number of tokens consumed in an LLM API call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCount(u64);

impl TokenCount {
    /// Creates a [`TokenCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for TokenCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Score types
// ---------------------------------------------------------------------------

/// A code review score in the range `[0.0, 10.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReviewScore(f64);

impl ReviewScore {
    /// Creates a [`ReviewScore`], returning `None` if `value` is outside
    /// `[0.0, 10.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=10.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the score as an `f64` in `[0.0, 10.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ReviewScore {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("review score {value} is outside 0-10"))
    }
}

impl From<ReviewScore> for f64 {
    fn from(score: ReviewScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for ReviewScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
